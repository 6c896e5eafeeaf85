//! Records we extract, store and report on.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;

use crate::prelude::*;

/// The target currency used for users who have never picked one.
pub const DEFAULT_TARGET_CURRENCY: &str = "USD";

/// Expense categories. This is a closed vocabulary, and it is also what we
/// offer to the vision model.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize,
    Serialize, JsonSchema,
)]
pub enum Category {
    Housing,
    Utilities,
    Transportation,
    Groceries,
    #[serde(rename = "Dining Out")]
    DiningOut,
    Healthcare,
    #[serde(rename = "Debt Payments")]
    DebtPayments,
    Insurance,
    Clothing,
    Entertainment,
    Education,
    Childcare,
    #[serde(rename = "Pet Care")]
    PetCare,
    Subscriptions,
    #[default]
    Miscellaneous,
}

impl Category {
    /// Every category, in the order we present them.
    pub const ALL: [Category; 15] = [
        Category::Housing,
        Category::Utilities,
        Category::Transportation,
        Category::Groceries,
        Category::DiningOut,
        Category::Healthcare,
        Category::DebtPayments,
        Category::Insurance,
        Category::Clothing,
        Category::Entertainment,
        Category::Education,
        Category::Childcare,
        Category::PetCare,
        Category::Subscriptions,
        Category::Miscellaneous,
    ];

    /// The human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Category::Housing => "Housing",
            Category::Utilities => "Utilities",
            Category::Transportation => "Transportation",
            Category::Groceries => "Groceries",
            Category::DiningOut => "Dining Out",
            Category::Healthcare => "Healthcare",
            Category::DebtPayments => "Debt Payments",
            Category::Insurance => "Insurance",
            Category::Clothing => "Clothing",
            Category::Entertainment => "Entertainment",
            Category::Education => "Education",
            Category::Childcare => "Childcare",
            Category::PetCare => "Pet Care",
            Category::Subscriptions => "Subscriptions",
            Category::Miscellaneous => "Miscellaneous",
        }
    }

    /// Look up a category by its exact label.
    pub fn from_label(label: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    /// Parse a category typed by a person. Unlike [`Category::from_label`],
    /// this ignores case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let labels = Category::ALL.map(Category::label).join(", ");
                anyhow!("unknown category {s:?} (expected one of: {labels})")
            })
    }
}

/// Fields extracted from a single receipt image.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ExtractedReceipt {
    /// The amount, if we found one.
    pub amount: Option<Decimal>,

    /// The transaction date, if we found one.
    pub date: Option<NaiveDate>,

    /// A short description, usually the first line of the receipt.
    pub description: String,

    /// The expense category.
    pub category: Category,

    /// A three-letter currency code. Not validated against ISO 4217.
    pub currency: String,
}

/// An expense owned by a user.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Expense {
    pub id: u64,

    /// The owning user.
    pub user: String,

    pub amount: Decimal,

    /// Currency of `amount`.
    pub currency: String,

    pub expense_date: NaiveDate,

    pub category: Category,

    #[serde(default)]
    pub description: String,

    /// `amount` in the owner's target currency, as of the last save. This is
    /// not recomputed if the owner later changes their target currency.
    pub amount_in_target_currency: Option<Decimal>,

    /// Our copy of the receipt image, for expenses created from uploads.
    pub receipt_image: Option<PathBuf>,
}

/// An income entry owned by a user.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Income {
    pub id: u64,

    /// The owning user.
    pub user: String,

    pub amount: Decimal,

    /// Currency of `amount`.
    pub currency: String,

    pub income_date: NaiveDate,

    #[serde(default)]
    pub description: String,

    /// A free-form label, such as "Salary".
    pub category: String,

    /// `amount` in the owner's target currency, as of the last save.
    pub amount_in_target_currency: Option<Decimal>,
}

/// Per-user settings.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct UserProfile {
    pub user: String,

    /// The currency we convert everything into.
    pub target_currency: String,
}
