//! The `profile` subcommand.

use clap::Args;

use crate::{
    async_utils::io::write_json, forms::validate_currency_code, models::UserProfile,
    prelude::*, store::LedgerOpts,
};

use super::OutputOpts;

/// Options for `profile`.
#[derive(Args, Debug)]
pub struct ProfileOpts {
    /// Change the currency that new and edited records are converted into.
    /// Existing records keep their old converted amounts.
    #[clap(long)]
    pub target_currency: Option<String>,

    #[clap(flatten)]
    pub ledger: LedgerOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// The `profile` subcommand: show, and optionally update, a user's profile.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_profile(opts: &ProfileOpts) -> Result<()> {
    let user = &opts.ledger.user;
    let mut ledger = opts.ledger.load().await?;
    if let Some(code) = &opts.target_currency {
        let code = validate_currency_code(code)?;
        info!(%user, %code, "Setting target currency");
        ledger.set_target_currency(user, code);
        opts.ledger.save(&ledger).await?;
    }

    let profile = UserProfile {
        user: user.clone(),
        target_currency: ledger.target_currency(user).to_owned(),
    };
    write_json(opts.output.output_path.as_deref(), &profile).await
}
