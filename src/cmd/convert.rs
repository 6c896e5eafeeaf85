//! The `convert` subcommand.

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;

use crate::{
    async_utils::io::write_json, currency::RatesOpts, prelude::*, receipt::local_today,
};

use super::OutputOpts;

/// Options for `convert`.
#[derive(Args, Debug)]
pub struct ConvertOpts {
    /// The amount to convert.
    pub amount: Decimal,

    /// The currency of the amount.
    pub from: String,

    /// The currency to convert into.
    pub to: String,

    /// Use exchange rates for this date (YYYY-MM-DD). Defaults to today.
    #[clap(long)]
    pub date: Option<NaiveDate>,

    #[clap(flatten)]
    pub rates: RatesOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// The `convert` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_convert(opts: &ConvertOpts) -> Result<()> {
    let converter = opts.rates.create_converter()?;
    let date = opts.date.unwrap_or_else(local_today);
    let conversion = converter
        .convert(opts.amount, date, &opts.from, &opts.to)
        .await;
    write_json(opts.output.output_path.as_deref(), &conversion).await
}
