//! Validating expense and income input.
//!
//! Forms hold whatever the user supplied. Creating a record requires some
//! fields. Editing a record changes only the fields that were supplied.

use std::{error, fmt};

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;

use crate::{
    models::{Category, Expense, Income},
    prelude::*,
};

/// Longest description we accept, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 255;

/// Cut a description read from a receipt down to the length a form would
/// accept.
pub fn truncate_description(description: &str) -> String {
    description.chars().take(MAX_DESCRIPTION_CHARS).collect()
}

/// Most decimal places we accept in an amount.
const MAX_AMOUNT_SCALE: u32 = 2;

/// One problem with one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Everything wrong with a form. Nothing is saved if there are any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Record an error for `field` unless `ok` holds.
    fn check(&mut self, field: &'static str, ok: bool, message: impl Into<String>) {
        if !ok {
            self.errors.push(FieldError {
                field,
                message: message.into(),
            });
        }
    }

    /// Record an error if a required field is missing.
    fn require<T>(&mut self, field: &'static str, value: &Option<T>) {
        self.check(field, value.is_some(), "this field is required");
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid input")?;
        for error in &self.errors {
            write!(f, "\n  {}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl error::Error for ValidationErrors {}

fn check_amount(errors: &mut ValidationErrors, amount: Option<Decimal>) {
    if let Some(amount) = amount {
        errors.check("amount", !amount.is_sign_negative(), "must not be negative");
        errors.check(
            "amount",
            amount.normalize().scale() <= MAX_AMOUNT_SCALE,
            format!("must have at most {MAX_AMOUNT_SCALE} decimal places"),
        );
    }
}

/// Validate a currency code, returning it uppercased.
fn check_currency(errors: &mut ValidationErrors, currency: Option<&str>) -> Option<String> {
    let currency = currency?.trim();
    let ok = currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic());
    errors.check("currency", ok, "must be a three-letter currency code");
    Some(currency.to_ascii_uppercase())
}

/// Validate a currency code on its own, returning it uppercased.
pub fn validate_currency_code(code: &str) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let code = check_currency(&mut errors, Some(code));
    errors.into_result()?;
    Ok(code.unwrap_or_default())
}

fn check_description(errors: &mut ValidationErrors, description: Option<&str>) {
    if let Some(description) = description {
        errors.check(
            "description",
            description.chars().count() <= MAX_DESCRIPTION_CHARS,
            format!("must be at most {MAX_DESCRIPTION_CHARS} characters"),
        );
    }
}

/// Expense fields, as typed by the user.
#[derive(Args, Clone, Debug, Default)]
pub struct ExpenseForm {
    /// The amount spent.
    #[clap(long)]
    pub amount: Option<Decimal>,

    /// Three-letter currency code of the amount.
    #[clap(long)]
    pub currency: Option<String>,

    /// Date of the expense, as YYYY-MM-DD. Defaults to today for new
    /// expenses.
    #[clap(long = "date")]
    pub expense_date: Option<NaiveDate>,

    /// Expense category. Defaults to "Miscellaneous" for new expenses.
    #[clap(long)]
    pub category: Option<Category>,

    /// A short description.
    #[clap(long)]
    pub description: Option<String>,
}

impl ExpenseForm {
    /// Build a new expense for `user`. `amount` and `currency` are required.
    pub fn create(&self, user: &str, today: NaiveDate) -> Result<Expense, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require("amount", &self.amount);
        errors.require("currency", &self.currency);
        let mut expense = Expense {
            id: 0,
            user: user.to_owned(),
            amount: Decimal::ZERO,
            currency: String::new(),
            expense_date: today,
            category: Category::default(),
            description: String::new(),
            amount_in_target_currency: None,
            receipt_image: None,
        };
        self.apply_checked(&mut expense, errors)?;
        Ok(expense)
    }

    /// Update `expense` with the supplied fields.
    pub fn apply(&self, expense: &mut Expense) -> Result<(), ValidationErrors> {
        self.apply_checked(expense, ValidationErrors::default())
    }

    fn apply_checked(
        &self,
        expense: &mut Expense,
        mut errors: ValidationErrors,
    ) -> Result<(), ValidationErrors> {
        check_amount(&mut errors, self.amount);
        let currency = check_currency(&mut errors, self.currency.as_deref());
        check_description(&mut errors, self.description.as_deref());
        errors.into_result()?;

        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(currency) = currency {
            expense.currency = currency;
        }
        if let Some(date) = self.expense_date {
            expense.expense_date = date;
        }
        if let Some(category) = self.category {
            expense.category = category;
        }
        if let Some(description) = &self.description {
            expense.description = description.trim().to_owned();
        }
        Ok(())
    }
}

/// Income fields, as typed by the user.
#[derive(Args, Clone, Debug, Default)]
pub struct IncomeForm {
    /// The amount received.
    #[clap(long)]
    pub amount: Option<Decimal>,

    /// Three-letter currency code of the amount.
    #[clap(long)]
    pub currency: Option<String>,

    /// Date of the income, as YYYY-MM-DD. Defaults to today for new
    /// incomes.
    #[clap(long = "date")]
    pub income_date: Option<NaiveDate>,

    /// A short description.
    #[clap(long)]
    pub description: Option<String>,

    /// A label, such as "Salary" or "Freelance".
    #[clap(long)]
    pub category: Option<String>,
}

impl IncomeForm {
    /// Build a new income for `user`. `amount`, `currency` and `category`
    /// are required.
    pub fn create(&self, user: &str, today: NaiveDate) -> Result<Income, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require("amount", &self.amount);
        errors.require("currency", &self.currency);
        errors.require("category", &self.category);
        let mut income = Income {
            id: 0,
            user: user.to_owned(),
            amount: Decimal::ZERO,
            currency: String::new(),
            income_date: today,
            description: String::new(),
            category: String::new(),
            amount_in_target_currency: None,
        };
        self.apply_checked(&mut income, errors)?;
        Ok(income)
    }

    /// Update `income` with the supplied fields.
    pub fn apply(&self, income: &mut Income) -> Result<(), ValidationErrors> {
        self.apply_checked(income, ValidationErrors::default())
    }

    fn apply_checked(
        &self,
        income: &mut Income,
        mut errors: ValidationErrors,
    ) -> Result<(), ValidationErrors> {
        check_amount(&mut errors, self.amount);
        let currency = check_currency(&mut errors, self.currency.as_deref());
        check_description(&mut errors, self.description.as_deref());
        if let Some(category) = &self.category {
            errors.check("category", !category.trim().is_empty(), "must not be blank");
        }
        errors.into_result()?;

        if let Some(amount) = self.amount {
            income.amount = amount;
        }
        if let Some(currency) = currency {
            income.currency = currency;
        }
        if let Some(date) = self.income_date {
            income.income_date = date;
        }
        if let Some(description) = &self.description {
            income.description = description.trim().to_owned();
        }
        if let Some(category) = &self.category {
            income.category = category.trim().to_owned();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn fields(errors: &ValidationErrors) -> Vec<&'static str> {
        errors.errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn new_expenses_get_defaults() {
        let form = ExpenseForm {
            amount: Some(dec("12.5")),
            currency: Some(" eur ".to_owned()),
            ..ExpenseForm::default()
        };
        let expense = form.create("ann", today()).unwrap();
        assert_eq!(expense.user, "ann");
        assert_eq!(expense.amount, dec("12.5"));
        assert_eq!(expense.currency, "EUR");
        assert_eq!(expense.expense_date, today());
        assert_eq!(expense.category, Category::Miscellaneous);
    }

    #[test]
    fn bad_expenses_report_every_field() {
        let form = ExpenseForm {
            amount: Some(dec("-1.234")),
            currency: Some("EURO".to_owned()),
            description: Some("x".repeat(MAX_DESCRIPTION_CHARS + 1)),
            ..ExpenseForm::default()
        };
        let errors = form.create("ann", today()).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["amount", "amount", "currency", "description"]
        );
        assert!(errors.to_string().starts_with("invalid input\n  amount:"));

        let errors = ExpenseForm::default().create("ann", today()).unwrap_err();
        assert_eq!(fields(&errors), vec!["amount", "currency"]);
    }

    #[test]
    fn truncated_descriptions_pass_validation() {
        let long = "é".repeat(MAX_DESCRIPTION_CHARS + 10);
        let description = truncate_description(&long);
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_CHARS);
        let form = ExpenseForm {
            amount: Some(dec("1")),
            currency: Some("USD".to_owned()),
            description: Some(description),
            ..ExpenseForm::default()
        };
        assert!(form.create("ann", today()).is_ok());
        assert_eq!(truncate_description("Cafe"), "Cafe");
    }

    #[test]
    fn trailing_zeros_do_not_count_as_decimal_places() {
        let form = ExpenseForm {
            amount: Some(dec("3.500")),
            currency: Some("USD".to_owned()),
            ..ExpenseForm::default()
        };
        assert!(form.create("ann", today()).is_ok());
    }

    #[test]
    fn edits_only_touch_supplied_fields() {
        let mut expense = ExpenseForm {
            amount: Some(dec("9.99")),
            currency: Some("usd".to_owned()),
            category: Some(Category::Groceries),
            ..ExpenseForm::default()
        }
        .create("ann", today())
        .unwrap();

        let edit = ExpenseForm {
            currency: Some("inr".to_owned()),
            ..ExpenseForm::default()
        };
        edit.apply(&mut expense).unwrap();
        assert_eq!(expense.currency, "INR");
        assert_eq!(expense.amount, dec("9.99"));
        assert_eq!(expense.category, Category::Groceries);

        let bad_edit = ExpenseForm {
            amount: Some(dec("1")),
            currency: Some("1$".to_owned()),
            ..ExpenseForm::default()
        };
        assert!(bad_edit.apply(&mut expense).is_err());
        assert_eq!(expense.amount, dec("9.99"));
    }

    #[test]
    fn currency_codes_are_uppercased() {
        assert_eq!(validate_currency_code(" krw ").unwrap(), "KRW");
        for bad in ["", "US", "USDT", "U$D", "€€€"] {
            let errors = validate_currency_code(bad).unwrap_err();
            assert_eq!(fields(&errors), vec!["currency"], "checking {bad:?}");
        }
    }

    #[test]
    fn incomes_need_a_category() {
        let form = IncomeForm {
            amount: Some(dec("1000")),
            currency: Some("USD".to_owned()),
            ..IncomeForm::default()
        };
        assert_eq!(
            fields(&form.create("ann", today()).unwrap_err()),
            vec!["category"]
        );

        let form = IncomeForm {
            category: Some("   ".to_owned()),
            ..form
        };
        assert_eq!(
            fields(&form.create("ann", today()).unwrap_err()),
            vec!["category"]
        );

        let form = IncomeForm {
            category: Some(" Salary ".to_owned()),
            ..form
        };
        let income = form.create("ann", today()).unwrap();
        assert_eq!(income.category, "Salary");
        assert_eq!(income.income_date, today());
    }
}
