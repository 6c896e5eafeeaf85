//! The `dashboard` subcommand.

use clap::Args;

use crate::{
    async_utils::io::write_json, dashboard::Dashboard, prelude::*, store::LedgerOpts,
};

use super::OutputOpts;

/// Options for `dashboard`.
#[derive(Args, Debug)]
pub struct DashboardOpts {
    #[clap(flatten)]
    pub ledger: LedgerOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// The `dashboard` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_dashboard(opts: &DashboardOpts) -> Result<()> {
    let ledger = opts.ledger.load().await?;
    let dashboard = Dashboard::build(&ledger, &opts.ledger.user);
    write_json(opts.output.output_path.as_deref(), &dashboard).await
}
