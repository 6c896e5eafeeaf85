//! Command-line entry points.

use clap::Args;

use crate::{
    bookkeeping::Bookkeeper, currency::RatesOpts, prelude::*, receipt::local_today,
    store::LedgerOpts,
};

pub mod convert;
pub mod dashboard;
pub mod expense;
pub mod income;
pub mod profile;
pub mod scan;
pub mod schema;
pub mod upload;

/// Where to write our output.
#[derive(Args, Clone, Debug)]
pub struct OutputOpts {
    /// Write JSON output to this file instead of stdout.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// Options for commands that save records.
#[derive(Args, Clone, Debug)]
pub struct BookOpts {
    #[clap(flatten)]
    pub ledger: LedgerOpts,

    #[clap(flatten)]
    pub rates: RatesOpts,
}

impl BookOpts {
    /// Create a bookkeeper for today.
    pub fn bookkeeper(&self) -> Result<Bookkeeper> {
        Ok(Bookkeeper::new(
            self.rates.create_converter()?,
            self.ledger.ledger.clone(),
            local_today(),
        ))
    }
}
