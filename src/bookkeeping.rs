//! Creating and editing a user's expenses and incomes.
//!
//! Every save converts the record's amount into the owner's target currency
//! as it stands at that moment. When conversion isn't possible, the
//! converted amount is left unset.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;

use crate::{
    currency::{Conversion, Converter},
    forms::{ExpenseForm, IncomeForm, truncate_description},
    models::{Expense, Income},
    prelude::*,
    receipt::{Extraction, ReceiptImage, engines::ExtractionEngine},
    store::{Ledger, store_receipt_image},
};

/// An expense created from a receipt, and how we read the receipt.
#[derive(Clone, Debug, Serialize, JsonSchema)]
pub struct ReceiptUpload {
    pub expense: Expense,
    pub extraction: Extraction,
}

/// Runs bookkeeping operations against a ledger.
pub struct Bookkeeper {
    /// Converts amounts into target currencies.
    converter: Converter,

    /// The ledger file. Receipt images are stored next to it.
    ledger_path: PathBuf,

    /// The date used whenever a record has no date of its own.
    today: NaiveDate,
}

impl Bookkeeper {
    /// Create a new bookkeeper.
    pub fn new(converter: Converter, ledger_path: PathBuf, today: NaiveDate) -> Self {
        Self {
            converter,
            ledger_path,
            today,
        }
    }

    /// Create an expense from a receipt image.
    ///
    /// If the receipt can't be read, the expense is created from the
    /// extraction's fallback values, so the user can fix it by hand.
    #[instrument(level = "debug", skip(self, extractor, ledger))]
    pub async fn upload_receipt(
        &self,
        extractor: &dyn ExtractionEngine,
        ledger: &mut Ledger,
        user: &str,
        image_path: &Path,
    ) -> Result<ReceiptUpload> {
        let image = ReceiptImage::from_path(image_path).await?;
        let extraction = extractor.extract(&image, self.today).await;
        if let Extraction::Unavailable { reason, .. } = &extraction {
            warn!("Could not read receipt, using default values: {reason}");
        }

        let receipt = extraction.receipt();
        let mut expense = Expense {
            id: 0,
            user: user.to_owned(),
            amount: receipt.amount.unwrap_or(Decimal::ZERO),
            currency: receipt.currency.clone(),
            expense_date: receipt.date.unwrap_or(self.today),
            category: receipt.category,
            description: truncate_description(&receipt.description),
            amount_in_target_currency: None,
            receipt_image: None,
        };
        expense.amount_in_target_currency = self
            .convert_for(
                ledger,
                user,
                expense.amount,
                expense.expense_date,
                &expense.currency,
            )
            .await;

        // Copy the image last, so a failure above leaves nothing behind.
        expense.receipt_image = Some(store_receipt_image(&self.ledger_path, &image).await?);
        let expense = ledger.insert_expense(expense).clone();
        Ok(ReceiptUpload {
            expense,
            extraction,
        })
    }

    /// Create an expense by hand.
    #[instrument(level = "debug", skip(self, ledger))]
    pub async fn add_expense(
        &self,
        ledger: &mut Ledger,
        user: &str,
        form: &ExpenseForm,
    ) -> Result<Expense> {
        let mut expense = form.create(user, self.today)?;
        expense.amount_in_target_currency = self
            .convert_for(
                ledger,
                user,
                expense.amount,
                expense.expense_date,
                &expense.currency,
            )
            .await;
        Ok(ledger.insert_expense(expense).clone())
    }

    /// Edit an expense and convert it again.
    #[instrument(level = "debug", skip(self, ledger))]
    pub async fn edit_expense(
        &self,
        ledger: &mut Ledger,
        user: &str,
        id: u64,
        form: &ExpenseForm,
    ) -> Result<Expense> {
        let mut expense = ledger.expense(user, id)?.clone();
        form.apply(&mut expense)?;
        expense.amount_in_target_currency = self
            .convert_for(
                ledger,
                user,
                expense.amount,
                expense.expense_date,
                &expense.currency,
            )
            .await;
        *ledger.expense_mut(user, id)? = expense.clone();
        Ok(expense)
    }

    /// Record an income.
    #[instrument(level = "debug", skip(self, ledger))]
    pub async fn add_income(
        &self,
        ledger: &mut Ledger,
        user: &str,
        form: &IncomeForm,
    ) -> Result<Income> {
        let mut income = form.create(user, self.today)?;
        income.amount_in_target_currency = self
            .convert_for(
                ledger,
                user,
                income.amount,
                income.income_date,
                &income.currency,
            )
            .await;
        Ok(ledger.insert_income(income).clone())
    }

    /// Edit an income and convert it again.
    #[instrument(level = "debug", skip(self, ledger))]
    pub async fn edit_income(
        &self,
        ledger: &mut Ledger,
        user: &str,
        id: u64,
        form: &IncomeForm,
    ) -> Result<Income> {
        let mut income = ledger.income(user, id)?.clone();
        form.apply(&mut income)?;
        income.amount_in_target_currency = self
            .convert_for(
                ledger,
                user,
                income.amount,
                income.income_date,
                &income.currency,
            )
            .await;
        *ledger.income_mut(user, id)? = income.clone();
        Ok(income)
    }

    /// Convert an amount into `user`'s current target currency.
    async fn convert_for(
        &self,
        ledger: &Ledger,
        user: &str,
        amount: Decimal,
        date: NaiveDate,
        currency: &str,
    ) -> Option<Decimal> {
        let target = ledger.target_currency(user);
        let conversion = self.converter.convert(amount, date, currency, target).await;
        if let Conversion::Unavailable { reason } = &conversion {
            warn!(%user, "Leaving amount in {target} unset: {reason}");
        }
        conversion.amount()
    }
}
