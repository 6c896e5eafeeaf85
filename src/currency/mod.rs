//! Currency conversion via historical exchange rates.
//!
//! Rates come from a provider that quotes everything against USD, so we
//! convert `from → USD → to`. Nothing is cached: each conversion fetches its
//! own rate table, exactly once.

use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use schemars::JsonSchema;

use crate::prelude::*;

pub mod open_exchange_rates;

/// A table of rates for one day, relative to the provider's base currency
/// (USD).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RateTable {
    /// The base currency, if the provider told us.
    #[serde(default)]
    pub base: Option<String>,

    /// Units of each currency per unit of the base currency.
    pub rates: BTreeMap<String, Decimal>,
}

impl RateTable {
    /// Build a quote for converting between two currencies. Returns `None` if
    /// either currency is missing or has a non-positive rate.
    pub fn quote(&self, date: NaiveDate, from: &str, to: &str) -> Option<ExchangeRateQuote> {
        let rate = |code: &str| {
            self.rates
                .get(code)
                .copied()
                .filter(|rate| rate.is_sign_positive() && !rate.is_zero())
        };
        Some(ExchangeRateQuote {
            date,
            rate_from_usd: rate(from)?,
            rate_to_usd: rate(to)?,
        })
    }
}

/// Exchange rates for a single conversion on a single date.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExchangeRateQuote {
    pub date: NaiveDate,

    /// Units of the source currency per USD.
    pub rate_from_usd: Decimal,

    /// Units of the target currency per USD.
    pub rate_to_usd: Decimal,
}

impl ExchangeRateQuote {
    /// Convert `amount`, rounding to cents.
    pub fn apply(&self, amount: Decimal) -> Option<Decimal> {
        let usd = amount.checked_div(self.rate_from_usd)?;
        Some(usd.checked_mul(self.rate_to_usd)?.round_dp(2))
    }

    /// The effective `from → to` rate.
    pub fn rate(&self) -> Option<Decimal> {
        self.rate_to_usd.checked_div(self.rate_from_usd)
    }
}

/// Interface to a source of historical exchange rates.
#[async_trait]
pub trait RateProvider: Send + Sync + 'static {
    /// Fetch the rate table for `date`.
    async fn historical_rates(&self, date: NaiveDate) -> Result<RateTable>;
}

/// A converted amount.
#[derive(Clone, Debug, PartialEq, Serialize, JsonSchema)]
pub struct ConvertedAmount {
    /// The amount in the target currency.
    pub amount: Decimal,

    /// Units of the target currency per unit of the source currency.
    pub rate: Decimal,
}

/// The outcome of a conversion.
#[derive(Clone, Debug, PartialEq, Serialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Conversion {
    Converted(ConvertedAmount),

    /// We couldn't convert, for the stated reason.
    Unavailable { reason: String },
}

impl Conversion {
    /// The converted amount, if we have one.
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Conversion::Converted(converted) => Some(converted.amount),
            Conversion::Unavailable { .. } => None,
        }
    }
}

/// Converts amounts between currencies.
#[derive(Clone)]
pub struct Converter {
    /// Where we get rates from. `None` if no provider is configured, in which
    /// case only same-currency conversions work.
    provider: Option<Arc<dyn RateProvider>>,
}

impl Converter {
    /// Create a converter using `provider`.
    pub fn new(provider: Option<Arc<dyn RateProvider>>) -> Self {
        Self { provider }
    }

    /// Convert `amount` from one currency to another, using rates for `date`.
    #[instrument(level = "debug", skip(self))]
    pub async fn convert(
        &self,
        amount: Decimal,
        date: NaiveDate,
        from_currency: &str,
        to_currency: &str,
    ) -> Conversion {
        let from = from_currency.trim().to_uppercase();
        let to = to_currency.trim().to_uppercase();
        if from == to {
            return Conversion::Converted(ConvertedAmount {
                amount,
                rate: Decimal::ONE,
            });
        }

        let unavailable = |reason: String| {
            warn!(%from, %to, %date, "Could not convert amount: {reason}");
            Conversion::Unavailable { reason }
        };

        let Some(provider) = &self.provider else {
            return unavailable("no exchange-rate API key is configured".to_owned());
        };
        let table = match provider.historical_rates(date).await {
            Ok(table) => table,
            Err(err) => return unavailable(format!("{err:#}")),
        };
        let Some(quote) = table.quote(date, &from, &to) else {
            return unavailable(format!("no usable rates for {from} and {to} on {date}"));
        };
        debug!(
            date = %quote.date,
            rate_from_usd = %quote.rate_from_usd,
            rate_to_usd = %quote.rate_to_usd,
            "Exchange rates"
        );

        match (quote.apply(amount), quote.rate()) {
            (Some(amount), Some(rate)) => {
                Conversion::Converted(ConvertedAmount { amount, rate })
            }
            _ => unavailable("conversion overflowed".to_owned()),
        }
    }
}

/// Exchange-rate options.
#[derive(Args, Clone)]
pub struct RatesOpts {
    /// Open Exchange Rates app ID. Without one, only same-currency
    /// conversions are possible.
    #[clap(long, env = "OPEN_EXCHANGE_RATES_API_KEY", hide_env_values = true)]
    pub rates_api_key: Option<String>,

    /// Base URL for historical rates. `{date}.json` is appended.
    #[clap(
        long,
        env = "OPEN_EXCHANGE_RATES_API_URL",
        default_value = open_exchange_rates::DEFAULT_API_URL
    )]
    pub rates_api_url: String,

    /// Timeout, in seconds, for exchange-rate requests.
    #[clap(long, default_value = "10")]
    pub rates_timeout: u64,
}

impl fmt::Debug for RatesOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RatesOpts")
            .field("rates_api_key", &self.rates_api_key.as_ref().map(|_| "<redacted>"))
            .field("rates_api_url", &self.rates_api_url)
            .field("rates_timeout", &self.rates_timeout)
            .finish()
    }
}

impl RatesOpts {
    /// Build a converter from these options.
    pub fn create_converter(&self) -> Result<Converter> {
        let provider = match self.rates_api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                let provider = open_exchange_rates::OpenExchangeRates::new(
                    self.rates_api_url.clone(),
                    key.to_owned(),
                    Duration::from_secs(self.rates_timeout),
                )?;
                Some(Arc::new(provider) as Arc<dyn RateProvider>)
            }
            _ => {
                debug!("No exchange-rate API key configured");
                None
            }
        };
        Ok(Converter::new(provider))
    }
}


#[cfg(test)]
mod tests {
    use std::{str::FromStr, sync::atomic::Ordering};

    use super::{testing::StaticRates, *};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 13).unwrap()
    }

    #[tokio::test]
    async fn same_currency_is_identity_without_network() {
        let (converter, rates) = StaticRates::converter();
        let conversion = converter.convert(dec("12.345"), date(), "eur", "EUR").await;
        assert_eq!(
            conversion,
            Conversion::Converted(ConvertedAmount {
                amount: dec("12.345"),
                rate: Decimal::ONE,
            })
        );
        assert_eq!(rates.requests.load(Ordering::SeqCst), 0);

        // No provider needed either.
        let converter = Converter::new(None);
        let conversion = converter.convert(dec("5"), date(), "USD", "USD").await;
        assert_eq!(conversion.amount(), Some(dec("5")));
    }

    #[tokio::test]
    async fn conversion_pivots_through_usd() {
        let (converter, rates) = StaticRates::converter();
        let conversion = converter.convert(dec("1000"), date(), "INR", "EUR").await;
        // round((1000 / 83.0) * 0.9, 2)
        assert_eq!(conversion.amount(), Some(dec("10.84")));
        assert_eq!(rates.requests.load(Ordering::SeqCst), 1);

        let conversion = converter.convert(dec("10"), date(), "EUR", "USD").await;
        assert_eq!(conversion.amount(), Some(dec("11.11")));
    }

    #[tokio::test]
    async fn missing_currencies_are_unavailable() {
        let (converter, _) = StaticRates::converter();
        let conversion = converter.convert(dec("1"), date(), "XYZ", "EUR").await;
        assert!(matches!(conversion, Conversion::Unavailable { .. }));
        assert_eq!(conversion.amount(), None);
    }

    #[tokio::test]
    async fn provider_failures_are_unavailable() {
        let converter = Converter::new(Some(Arc::new(StaticRates::failing())));
        match converter.convert(dec("1"), date(), "INR", "EUR").await {
            Conversion::Unavailable { reason } => assert!(reason.contains("401")),
            other => panic!("expected unavailable, got {other:?}"),
        }

        let converter = Converter::new(None);
        let conversion = converter.convert(dec("1"), date(), "INR", "EUR").await;
        assert!(matches!(conversion, Conversion::Unavailable { .. }));
    }

    #[tokio::test]
    async fn blank_api_keys_mean_no_provider() {
        let opts = RatesOpts {
            rates_api_key: Some("  ".to_owned()),
            rates_api_url: open_exchange_rates::DEFAULT_API_URL.to_owned(),
            rates_timeout: 10,
        };
        let converter = opts.create_converter().unwrap();
        let conversion = converter.convert(dec("1"), date(), "INR", "EUR").await;
        assert!(matches!(conversion, Conversion::Unavailable { .. }));
    }

    #[test]
    fn api_keys_are_not_logged() {
        let opts = RatesOpts {
            rates_api_key: Some("sekrit".to_owned()),
            rates_api_url: open_exchange_rates::DEFAULT_API_URL.to_owned(),
            rates_timeout: 10,
        };
        assert!(!format!("{opts:?}").contains("sekrit"));
    }

    #[test]
    fn zero_rates_are_rejected() {
        let table = RateTable {
            base: None,
            rates: [("USD".to_owned(), dec("1")), ("ZZZ".to_owned(), dec("0"))]
                .into_iter()
                .collect(),
        };
        assert!(table.quote(date(), "ZZZ", "USD").is_none());
        assert!(table.quote(date(), "USD", "USD").is_some());
    }

    #[test]
    fn conversion_serializes_with_status_tag() {
        let json = serde_json::to_value(Conversion::Converted(ConvertedAmount {
            amount: dec("10.84"),
            rate: dec("0.5"),
        }))
        .unwrap();
        assert_eq!(json["status"], "converted");
        assert_eq!(json["amount"], "10.84");
    }
}
