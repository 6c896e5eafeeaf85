//! The `schema` subcommand.

use clap::{Args, ValueEnum};
use schemars::schema_for;

use crate::{
    async_utils::io::write_json,
    bookkeeping::ReceiptUpload,
    currency::Conversion,
    dashboard::Dashboard,
    models::{Expense, ExtractedReceipt, Income, UserProfile},
    prelude::*,
    receipt::Extraction,
    store::Ledger,
};

/// The different schema types we support.
///
/// We parse these as PascalCase, because they represent type names.
#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "PascalCase")]
pub enum SchemaType {
    /// Output of `convert`.
    Conversion,
    /// Output of `dashboard`.
    Dashboard,
    /// An expense, as stored and printed.
    Expense,
    /// Output of `scan`.
    Extraction,
    /// Receipt fields, extracted or defaulted.
    ExtractedReceipt,
    /// An income, as stored and printed.
    Income,
    /// The ledger file.
    Ledger,
    /// Output of `upload`.
    ReceiptUpload,
    /// Output of `profile`.
    UserProfile,
}

/// Schema command line arguments.
#[derive(Debug, Args)]
pub struct SchemaOpts {
    /// The schema type to generate.
    #[clap(value_enum, value_name = "TYPE")]
    pub schema_type: SchemaType,

    /// The output path to write the schema to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `schema` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_schema(schema_opts: &SchemaOpts) -> Result<()> {
    let schema = match schema_opts.schema_type {
        SchemaType::Conversion => schema_for!(Conversion),
        SchemaType::Dashboard => schema_for!(Dashboard),
        SchemaType::Expense => schema_for!(Expense),
        SchemaType::Extraction => schema_for!(Extraction),
        SchemaType::ExtractedReceipt => schema_for!(ExtractedReceipt),
        SchemaType::Income => schema_for!(Income),
        SchemaType::Ledger => schema_for!(Ledger),
        SchemaType::ReceiptUpload => schema_for!(ReceiptUpload),
        SchemaType::UserProfile => schema_for!(UserProfile),
    };
    write_json(schema_opts.output_path.as_deref(), &schema).await
}
