//! A summary of one user's spending and income.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use schemars::JsonSchema;

use crate::{
    models::{Expense, Income},
    prelude::*,
    store::Ledger,
};

/// Label for expenses with a blank category. [`Category`] labels are never
/// blank, so this only covers an empty key reaching [`display_category`].
///
/// [`Category`]: crate::models::Category
const UNCATEGORIZED: &str = "Uncategorized";

/// Spending in one category.
#[derive(Clone, Debug, PartialEq, Serialize, JsonSchema)]
pub struct CategoryTotal {
    pub category: String,

    /// Sum of converted amounts. Unconverted expenses count as zero.
    pub total: Decimal,
}

/// Everything on a user's dashboard.
#[derive(Clone, Debug, Serialize, JsonSchema)]
pub struct Dashboard {
    /// The currency that totals are expressed in.
    pub target_currency: String,

    /// Spending per category, ordered by category.
    pub categories: Vec<CategoryTotal>,

    pub total_expenses: Decimal,

    pub total_income: Decimal,

    /// Expenses, newest first.
    pub expenses: Vec<Expense>,

    /// Incomes, newest first.
    pub incomes: Vec<Income>,
}

impl Dashboard {
    /// Summarize `user`'s records.
    ///
    /// Totals use each record's stored converted amount. Records saved under
    /// an earlier target currency are not converted again.
    pub fn build(ledger: &Ledger, user: &str) -> Self {
        let expenses = ledger.expenses_for(user);
        let incomes = ledger.incomes_for(user);

        let mut by_category = BTreeMap::<String, Decimal>::new();
        for expense in &expenses {
            let key = expense.category.label().trim().to_lowercase();
            *by_category.entry(key).or_default() +=
                converted(expense.amount_in_target_currency);
        }
        let categories = by_category
            .into_iter()
            .map(|(key, total)| CategoryTotal {
                category: display_category(&key),
                total,
            })
            .collect();

        Self {
            target_currency: ledger.target_currency(user).to_owned(),
            categories,
            total_expenses: expenses
                .iter()
                .map(|e| converted(e.amount_in_target_currency))
                .sum(),
            total_income: incomes
                .iter()
                .map(|i| converted(i.amount_in_target_currency))
                .sum(),
            expenses: expenses.into_iter().cloned().collect(),
            incomes: incomes.into_iter().cloned().collect(),
        }
    }
}

fn converted(amount: Option<Decimal>) -> Decimal {
    amount.unwrap_or(Decimal::ZERO)
}

/// Turn a normalized category key back into a label: first letter upper
/// case, the rest lower case.
fn display_category(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => UNCATEGORIZED.to_owned(),
    }
}
