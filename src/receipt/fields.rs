//! Pulling receipt fields out of raw OCR text.
//!
//! These are deliberately simple heuristics. The first amount-shaped token
//! wins, whether or not it is the total.

use std::{str::FromStr, sync::LazyLock};

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::models::{Category, ExtractedReceipt};

/// Description used when the OCR text is blank.
pub const DEFAULT_DESCRIPTION: &str = "Receipt Expense";

/// Amounts with thousands separators ("1,234.56", "12.345,67"), or without
/// ("123.45", "12,50").
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:[,.]\d{3})+[.,]\d{2}|\d+[.,]\d{2}")
        .expect("failed to compile regex")
});

/// `DD/MM/YYYY`, `DD-MM-YYYY` or `YYYY-MM-DD`.
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{2}[/-]\d{2}[/-]\d{4}|\d{4}-\d{2}-\d{2}")
        .expect("failed to compile regex")
});

/// Date formats we try, in order.
const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

/// Keywords for each category we can guess from OCR text. Earlier entries
/// take priority.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Groceries, &["grocery", "supermarket", "store"]),
    (Category::DiningOut, &["restaurant", "cafe", "food"]),
    (Category::Transportation, &["uber", "ola", "taxi", "bus", "train"]),
    (Category::Entertainment, &["movie", "cinema", "netflix"]),
];

/// Extract receipt fields from OCR text. We have no currency detection, so
/// the caller supplies `currency`.
pub fn parse_receipt_text(text: &str, currency: &str) -> ExtractedReceipt {
    ExtractedReceipt {
        amount: extract_amount(text),
        date: extract_date(text),
        description: extract_description(text),
        category: guess_category(text),
        currency: currency.to_owned(),
    }
}

/// Find the first amount-shaped token.
pub fn extract_amount(text: &str) -> Option<Decimal> {
    AMOUNT_RE
        .find(text)
        .and_then(|m| parse_amount_token(m.as_str()))
}

/// Parse a token matched by [`AMOUNT_RE`]. The last separator is the decimal
/// point, and any earlier ones are thousands separators.
fn parse_amount_token(token: &str) -> Option<Decimal> {
    let split = token.rfind(['.', ','])?;
    let integer: String = token[..split]
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let fraction = &token[split + 1..];
    Decimal::from_str(&format!("{integer}.{fraction}")).ok()
}

/// Find the first date-shaped token and try each of our formats on it. A
/// token that doesn't parse with any format gives `None`.
pub fn extract_date(text: &str) -> Option<NaiveDate> {
    let token = DATE_RE.find(text)?.as_str();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format).ok())
}

/// The first non-blank line, trimmed.
pub fn extract_description(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_owned()
}

/// Guess a category from keywords anywhere in the text.
pub fn guess_category(text: &str) -> Category {
    let text = text.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Miscellaneous)
}
