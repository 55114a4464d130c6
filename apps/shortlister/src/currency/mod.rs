//! Currency conversion into the reference currency.
//!
//! `RateLookup` is the external exchange-rate service; `CurrencyNormalizer`
//! is what the eligibility rules call. Lookups are never retried and have
//! no fallback rate: a failure is fatal for the applicant being evaluated.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// All compensation rates are compared in this currency.
pub const REFERENCE_CURRENCY: &str = "USD";

#[derive(Debug, Error)]
pub enum CurrencyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exchange rate API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("no {to} rate available for {from}")]
    MissingRate { from: String, to: String },
}

#[async_trait]
pub trait RateLookup: Send + Sync {
    /// Multipliers converting one unit of `from` into each of `to`.
    async fn rates(&self, from: &str, to: &[&str]) -> Result<HashMap<String, f64>, CurrencyError>;
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    rates: HashMap<String, f64>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
}

/// `RateLookup` over an open.er-api.com compatible endpoint: `GET {base}/{FROM}`.
#[derive(Clone)]
pub struct HttpRateLookup {
    client: Client,
    base_url: String,
}

impl HttpRateLookup {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RateLookup for HttpRateLookup {
    async fn rates(&self, from: &str, to: &[&str]) -> Result<HashMap<String, f64>, CurrencyError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, from))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CurrencyError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: LatestRatesResponse = response.json().await?;
        if body.result.as_deref().is_some_and(|r| r != "success") {
            return Err(CurrencyError::Api {
                status: status.as_u16(),
                message: body.error_type.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        select_rates(from, &body.rates, to)
    }
}

fn select_rates(
    from: &str,
    available: &HashMap<String, f64>,
    to: &[&str],
) -> Result<HashMap<String, f64>, CurrencyError> {
    to.iter()
        .map(|target| {
            available
                .get(*target)
                .map(|rate| (target.to_string(), *rate))
                .ok_or_else(|| CurrencyError::MissingRate {
                    from: from.to_string(),
                    to: target.to_string(),
                })
        })
        .collect()
}

/// Converts amounts in arbitrary currencies into `REFERENCE_CURRENCY`.
pub struct CurrencyNormalizer<'a> {
    lookup: &'a dyn RateLookup,
}

impl<'a> CurrencyNormalizer<'a> {
    pub fn new(lookup: &'a dyn RateLookup) -> Self {
        Self { lookup }
    }

    /// Multiplier for one unit of `currency` (case-insensitive) in the reference currency.
    /// Calls the lookup exactly once; callers skip it for the reference currency.
    pub async fn multiplier(&self, currency: &str) -> Result<f64, CurrencyError> {
        let from = currency.trim().to_ascii_uppercase();
        let rates = self.lookup.rates(&from, &[REFERENCE_CURRENCY]).await?;
        let rate = rates
            .get(REFERENCE_CURRENCY)
            .copied()
            .ok_or_else(|| CurrencyError::MissingRate {
                from: from.clone(),
                to: REFERENCE_CURRENCY.to_string(),
            })?;
        debug!("1 {from} = {rate} {REFERENCE_CURRENCY}");
        Ok(rate)
    }

    /// `amount` in the reference currency, rounded to cents.
    /// Amounts already in the reference currency pass through untouched with no lookup.
    pub async fn normalize(&self, amount: f64, currency: &str) -> Result<f64, CurrencyError> {
        if is_reference(currency) {
            return Ok(amount);
        }
        let rate = self.multiplier(currency).await?;
        Ok(round_to(amount * rate, 2))
    }
}

pub fn is_reference(currency: &str) -> bool {
    currency.trim().eq_ignore_ascii_case(REFERENCE_CURRENCY)
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
