use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::{prelude::*, ui::Ui};

mod async_utils;
mod bookkeeping;
mod cmd;
mod currency;
mod dashboard;
mod data_url;
mod drivers;
mod forms;
mod llm_client;
mod models;
mod prelude;
mod receipt;
mod store;
mod ui;

/// Track expenses from receipt images.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - OPENAI_API_KEY: Key for the vision model. Without it, receipts
    read with `--backend llm` get default values.
  - OPENAI_API_BASE (optional): Override the server URL.
  - OPEN_EXCHANGE_RATES_API_KEY: Open Exchange Rates app ID. Without
    it, only same-currency conversions work.
  - OPEN_EXCHANGE_RATES_API_URL (optional): Override the rates URL.
  - BUDGETLENS_LEDGER (optional): The ledger file.
  - BUDGETLENS_USER (optional): Whose records to use.

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// Read a receipt image and print what we found, without saving it.
    Scan(cmd::scan::ScanOpts),
    /// Create an expense from a receipt image.
    Upload(cmd::upload::UploadOpts),
    /// Add, edit and view expenses.
    #[clap(subcommand)]
    Expense(cmd::expense::ExpenseCmd),
    /// Add, edit and view incomes.
    #[clap(subcommand)]
    Income(cmd::income::IncomeCmd),
    /// Convert an amount between currencies.
    Convert(cmd::convert::ConvertOpts),
    /// Summarize spending and income.
    Dashboard(cmd::dashboard::DashboardOpts),
    /// Show or change a user's target currency.
    Profile(cmd::profile::ProfileOpts),
    /// Print schemas for our JSON formats.
    Schema(cmd::schema::SchemaOpts),
}

impl Cmd {
    /// Are we using stdout for output?
    fn using_stdout_for_output(&self) -> bool {
        match self {
            Cmd::Scan(opts) => opts.output.output_path.is_none(),
            Cmd::Upload(opts) => opts.output.output_path.is_none(),
            Cmd::Expense(expense_cmd) => expense_cmd.output_path().is_none(),
            Cmd::Income(income_cmd) => income_cmd.output_path().is_none(),
            Cmd::Convert(opts) => opts.output.output_path.is_none(),
            Cmd::Dashboard(opts) => opts.output.output_path.is_none(),
            Cmd::Profile(opts) => opts.output.output_path.is_none(),
            Cmd::Schema(opts) => opts.output_path.is_none(),
        }
    }
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main]
async fn main() -> Result<()> {
    let ui = Ui::init();

    // Initialize tracing.
    let directive =
        Directive::from_str("info").expect("built-in directive should be valid");
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(ui.get_stderr_writer())
        .with_filter(env_filter);
    tracing_subscriber::registry().with(subscriber).init();

    real_main(ui).await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main(ui: Ui) -> Result<()> {
    // Load environment variables from a `.env` file, if it exists.
    dotenvy::dotenv().ok();

    let opts = Opts::parse();
    debug!("Parsed options: {:?}", opts);

    // Hide spinners if we're using stdout for output.
    if opts.subcmd.using_stdout_for_output() {
        ui.hide_progress_bars();
    }

    match &opts.subcmd {
        Cmd::Scan(opts) => cmd::scan::cmd_scan(&ui, opts).await,
        Cmd::Upload(opts) => cmd::upload::cmd_upload(&ui, opts).await,
        Cmd::Expense(expense_cmd) => cmd::expense::cmd_expense(expense_cmd).await,
        Cmd::Income(income_cmd) => cmd::income::cmd_income(income_cmd).await,
        Cmd::Convert(opts) => cmd::convert::cmd_convert(opts).await,
        Cmd::Dashboard(opts) => cmd::dashboard::cmd_dashboard(opts).await,
        Cmd::Profile(opts) => cmd::profile::cmd_profile(opts).await,
        Cmd::Schema(opts) => cmd::schema::cmd_schema(opts).await,
    }
}
