//! The `expense` subcommands.

use clap::{Args, Subcommand};

use crate::{
    async_utils::io::write_json, forms::ExpenseForm, prelude::*, store::LedgerOpts,
};

use super::{BookOpts, OutputOpts};

/// Work with expenses.
#[derive(Debug, Subcommand)]
pub enum ExpenseCmd {
    /// Record an expense by hand.
    Add(AddExpenseOpts),
    /// Change an expense. Only the fields you supply are changed.
    Edit(EditExpenseOpts),
    /// Show one expense.
    Show(ShowExpenseOpts),
    /// List expenses, newest first.
    List(ListExpensesOpts),
}

impl ExpenseCmd {
    /// Where are we writing output?
    pub fn output_path(&self) -> Option<&Path> {
        let output = match self {
            ExpenseCmd::Add(opts) => &opts.output,
            ExpenseCmd::Edit(opts) => &opts.output,
            ExpenseCmd::Show(opts) => &opts.output,
            ExpenseCmd::List(opts) => &opts.output,
        };
        output.output_path.as_deref()
    }
}

/// Options for `expense add`.
#[derive(Args, Debug)]
pub struct AddExpenseOpts {
    #[clap(flatten)]
    pub form: ExpenseForm,

    #[clap(flatten)]
    pub book: BookOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// Options for `expense edit`.
#[derive(Args, Debug)]
pub struct EditExpenseOpts {
    /// The expense to change.
    pub id: u64,

    #[clap(flatten)]
    pub form: ExpenseForm,

    #[clap(flatten)]
    pub book: BookOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// Options for `expense show`.
#[derive(Args, Debug)]
pub struct ShowExpenseOpts {
    /// The expense to show.
    pub id: u64,

    #[clap(flatten)]
    pub ledger: LedgerOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// Options for `expense list`.
#[derive(Args, Debug)]
pub struct ListExpensesOpts {
    #[clap(flatten)]
    pub ledger: LedgerOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// Run an `expense` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_expense(cmd: &ExpenseCmd) -> Result<()> {
    match cmd {
        ExpenseCmd::Add(opts) => {
            let bookkeeper = opts.book.bookkeeper()?;
            let mut ledger = opts.book.ledger.load().await?;
            let expense = bookkeeper
                .add_expense(&mut ledger, &opts.book.ledger.user, &opts.form)
                .await?;
            opts.book.ledger.save(&ledger).await?;
            info!(id = expense.id, "Added expense");
            write_json(opts.output.output_path.as_deref(), &expense).await
        }
        ExpenseCmd::Edit(opts) => {
            let bookkeeper = opts.book.bookkeeper()?;
            let mut ledger = opts.book.ledger.load().await?;
            let expense = bookkeeper
                .edit_expense(&mut ledger, &opts.book.ledger.user, opts.id, &opts.form)
                .await?;
            opts.book.ledger.save(&ledger).await?;
            info!(id = expense.id, "Updated expense");
            write_json(opts.output.output_path.as_deref(), &expense).await
        }
        ExpenseCmd::Show(opts) => {
            let ledger = opts.ledger.load().await?;
            let expense = ledger.expense(&opts.ledger.user, opts.id)?;
            write_json(opts.output.output_path.as_deref(), expense).await
        }
        ExpenseCmd::List(opts) => {
            let ledger = opts.ledger.load().await?;
            let expenses = ledger.expenses_for(&opts.ledger.user);
            write_json(opts.output.output_path.as_deref(), &expenses).await
        }
    }
}
