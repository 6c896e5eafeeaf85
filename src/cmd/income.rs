//! The `income` subcommands.

use clap::{Args, Subcommand};

use crate::{
    async_utils::io::write_json, forms::IncomeForm, prelude::*, store::LedgerOpts,
};

use super::{BookOpts, OutputOpts};

/// Work with incomes.
#[derive(Debug, Subcommand)]
pub enum IncomeCmd {
    /// Record an income.
    Add(AddIncomeOpts),
    /// Change an income. Only the fields you supply are changed.
    Edit(EditIncomeOpts),
    /// Show one income.
    Show(ShowIncomeOpts),
    /// List incomes, newest first.
    List(ListIncomesOpts),
}

impl IncomeCmd {
    /// Where are we writing output?
    pub fn output_path(&self) -> Option<&Path> {
        let output = match self {
            IncomeCmd::Add(opts) => &opts.output,
            IncomeCmd::Edit(opts) => &opts.output,
            IncomeCmd::Show(opts) => &opts.output,
            IncomeCmd::List(opts) => &opts.output,
        };
        output.output_path.as_deref()
    }
}

/// Options for `income add`.
#[derive(Args, Debug)]
pub struct AddIncomeOpts {
    #[clap(flatten)]
    pub form: IncomeForm,

    #[clap(flatten)]
    pub book: BookOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// Options for `income edit`.
#[derive(Args, Debug)]
pub struct EditIncomeOpts {
    /// The income to change.
    pub id: u64,

    #[clap(flatten)]
    pub form: IncomeForm,

    #[clap(flatten)]
    pub book: BookOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// Options for `income show`.
#[derive(Args, Debug)]
pub struct ShowIncomeOpts {
    /// The income to show.
    pub id: u64,

    #[clap(flatten)]
    pub ledger: LedgerOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// Options for `income list`.
#[derive(Args, Debug)]
pub struct ListIncomesOpts {
    #[clap(flatten)]
    pub ledger: LedgerOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// Run an `income` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_income(cmd: &IncomeCmd) -> Result<()> {
    match cmd {
        IncomeCmd::Add(opts) => {
            let bookkeeper = opts.book.bookkeeper()?;
            let mut ledger = opts.book.ledger.load().await?;
            let income = bookkeeper
                .add_income(&mut ledger, &opts.book.ledger.user, &opts.form)
                .await?;
            opts.book.ledger.save(&ledger).await?;
            info!(id = income.id, "Added income");
            write_json(opts.output.output_path.as_deref(), &income).await
        }
        IncomeCmd::Edit(opts) => {
            let bookkeeper = opts.book.bookkeeper()?;
            let mut ledger = opts.book.ledger.load().await?;
            let income = bookkeeper
                .edit_income(&mut ledger, &opts.book.ledger.user, opts.id, &opts.form)
                .await?;
            opts.book.ledger.save(&ledger).await?;
            info!(id = income.id, "Updated income");
            write_json(opts.output.output_path.as_deref(), &income).await
        }
        IncomeCmd::Show(opts) => {
            let ledger = opts.ledger.load().await?;
            let income = ledger.income(&opts.ledger.user, opts.id)?;
            write_json(opts.output.output_path.as_deref(), income).await
        }
        IncomeCmd::List(opts) => {
            let ledger = opts.ledger.load().await?;
            let incomes = ledger.incomes_for(&opts.ledger.user);
            write_json(opts.output.output_path.as_deref(), &incomes).await
        }
    }
}
