//! Cleaning up what the vision model tells us.
//!
//! Models are asked for strict JSON, but they wrap it in Markdown fences,
//! return amounts as strings, and write dates in whatever order the receipt
//! used. We repair what we can and substitute defaults for the rest.

use std::str::FromStr;

use chrono::{Datelike as _, NaiveDate};
use rust_decimal::Decimal;
use serde_json::Map;

use crate::{
    models::{Category, ExtractedReceipt},
    prelude::*,
};

use super::{Extraction, fields::DEFAULT_DESCRIPTION};

/// Currency we assume when the model doesn't give one.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Amount we assume when the model gives us nothing usable at all.
pub fn default_amount() -> Decimal {
    Decimal::new(1000, 2)
}

/// The bundle we fall back to whenever the vision model can't help.
pub fn hosted_model_default(today: NaiveDate) -> ExtractedReceipt {
    ExtractedReceipt {
        amount: Some(default_amount()),
        date: Some(today),
        description: DEFAULT_DESCRIPTION.to_owned(),
        category: Category::Miscellaneous,
        currency: DEFAULT_CURRENCY.to_owned(),
    }
}

/// Turn the raw text of a model response into receipt fields.
pub fn normalize_response(content: &str, today: NaiveDate) -> Extraction {
    let content = strip_code_fence(content);
    let object = match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            error!(%other, "Vision model returned JSON that isn't an object");
            return Extraction::Unavailable {
                reason: "vision model response was not a JSON object".to_owned(),
                fallback: hosted_model_default(today),
            };
        }
        Err(err) => {
            error!(%err, content, "Cannot parse vision model response as JSON");
            return Extraction::Unavailable {
                reason: format!("vision model response was not valid JSON: {err}"),
                fallback: hosted_model_default(today),
            };
        }
    };
    Extraction::Extracted(receipt_from_object(&object, today))
}

/// Strip a Markdown code fence, with or without a `json` tag.
fn strip_code_fence(content: &str) -> &str {
    let content = content.trim();
    if content.len() >= 6 && content.starts_with("```") && content.ends_with("```") {
        let inner = &content[3..content.len() - 3];
        inner.strip_prefix("json").unwrap_or(inner).trim()
    } else {
        content
    }
}

fn receipt_from_object(object: &Map<String, Value>, today: NaiveDate) -> ExtractedReceipt {
    let category = object
        .get("category")
        .and_then(Value::as_str)
        .and_then(|label| Category::from_label(label.trim()))
        .unwrap_or_default();
    let currency = object
        .get("currency")
        .and_then(Value::as_str)
        .map(|code| code.trim().to_uppercase())
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_owned());
    let date = match object.get("date").and_then(Value::as_str) {
        Some(raw) => normalize_date(raw, today),
        None => today,
    };
    let description = object
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_owned();
    ExtractedReceipt {
        amount: object.get("amount").and_then(coerce_amount),
        date: Some(date),
        description,
        category,
        currency,
    }
}

/// Coerce a JSON amount to a decimal. Missing amounts stay missing, and
/// anything we can't make sense of becomes zero.
fn coerce_amount(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Null => return None,
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().replace(',', "."),
        other => {
            warn!(%other, "Invalid amount from vision model, using zero");
            return Some(Decimal::ZERO);
        }
    };
    match Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
        Ok(amount) => Some(amount),
        Err(err) => {
            warn!(amount = %text, %err, "Invalid amount from vision model, using zero");
            Some(Decimal::ZERO)
        }
    }
}

/// Normalize a date written as `YYYY-MM-DD`, `DD-MM-YYYY` or `MM-DD-YYYY`
/// (with `-`, `/` or `.` separators) to a calendar date. We prefer day-first
/// when both orderings are plausible. Anything we can't read becomes
/// `today`.
pub fn normalize_date(raw: &str, today: NaiveDate) -> NaiveDate {
    let text = raw.trim().replace(['/', '.'], "-");
    let parts = text.split('-').collect::<Vec<_>>();

    // Every readable form has exactly three unsigned parts.
    let numbers = parts
        .iter()
        .map(|part| parse_date_part(part.trim()))
        .collect::<Option<Vec<_>>>();
    let parsed = match numbers.as_deref() {
        Some(&[first, second, third]) => reorder_date_parts(first, second, third, today.year()),
        _ => None,
    };

    parsed.unwrap_or_else(|| {
        error!(date = raw, "Could not parse date, using today");
        today
    })
}

/// Parse one part of a date. Only plain digits count, so no signs.
fn parse_date_part(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Work out which of three date components is the year, month and day.
fn reorder_date_parts(
    first: u32,
    second: u32,
    third: u32,
    current_year: i32,
) -> Option<NaiveDate> {
    let (year, month, day) = if first > 31 && first <= 9999 && second <= 12 && third <= 31 {
        (first, second, third)
    } else if first <= 31 && second <= 12 && third <= 9999 {
        (expand_year(third, current_year), second, first)
    } else if first <= 12 && second <= 31 && third <= 9999 {
        (expand_year(third, current_year), first, second)
    } else {
        return None;
    };
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// Expand a two-digit year using the current century.
fn expand_year(year: u32, current_year: i32) -> u32 {
    if year < 100 {
        let century = u32::try_from(current_year / 100 * 100).unwrap_or(2000);
        century + year
    } else {
        year
    }
}
