//! Yahoo Finance options API client.
//!
//! Endpoint: `{base_url}/v7/finance/options/{SYMBOL}`
//! - Without `date`: lists `expirationDates` and returns the nearest chain
//! - With `date=<unix seconds>`: returns the chain for that expiration
//!
//! Every response is wrapped as `{"optionChain": {"result": [...], "error": ...}}`.
//!
//! The endpoint rejects requests without a crumb. A crumb is obtained once per
//! client: visit `cookie_url` to pick up the session cookie, then read
//! `{base_url}/v1/test/getcrumb` with that cookie. The crumb is sent as a
//! `crumb` query parameter and dropped after a 401/403 so the next request
//! fetches a fresh one.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::provider::{MarketDataProvider, ProviderError};
use super::types::{ContractRecord, ExpirationChain};
use crate::config::ProviderConfig;

/// Minimum interval between requests.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);

/// Response envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsEnvelope {
    pub option_chain: OptionChainBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionChainBody {
    #[serde(default)]
    pub result: Vec<OptionChainResult>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub description: String,
}

/// One entry of `optionChain.result`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChainResult {
    pub underlying_symbol: String,
    #[serde(default)]
    pub expiration_dates: Vec<i64>,
    #[serde(default)]
    pub quote: Option<RawQuote>,
    #[serde(default)]
    pub options: Vec<RawOptionSet>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuote {
    #[serde(default)]
    pub regular_market_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptionSet {
    pub expiration_date: i64,
    #[serde(default)]
    pub calls: Vec<RawContract>,
    #[serde(default)]
    pub puts: Vec<RawContract>,
}

/// Raw contract row from the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContract {
    pub contract_symbol: String,
    pub strike: f64,
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default)]
    pub implied_volatility: Option<f64>,
    #[serde(default)]
    pub expiration: Option<i64>,
}

impl RawContract {
    pub fn to_record(&self) -> ContractRecord {
        ContractRecord {
            contract_symbol: self.contract_symbol.clone(),
            strike: self.strike,
            last_price: self.last_price,
            implied_volatility: self.implied_volatility,
        }
    }
}

impl OptionsEnvelope {
    /// Unwrap the single result, turning API-level errors into `ProviderError`.
    pub fn into_result(self, symbol: &str) -> Result<OptionChainResult, ProviderError> {
        if let Some(err) = self.option_chain.error {
            return Err(ProviderError::ApiError(format!(
                "{}: {}",
                err.code, err.description
            )));
        }

        self.option_chain
            .result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NoData {
                symbol: symbol.to_string(),
            })
    }
}

impl OptionChainResult {
    /// Listed expirations as calendar dates.
    pub fn expirations(&self) -> Result<Vec<NaiveDate>, ProviderError> {
        self.expiration_dates
            .iter()
            .map(|&ts| unix_to_date(ts))
            .collect()
    }

    /// Build the chain for `expiration` from this result.
    ///
    /// An expiration with no contracts comes back as an empty chain.
    pub fn to_chain(&self, expiration: NaiveDate) -> Result<ExpirationChain, ProviderError> {
        let underlying_price = self.quote.as_ref().and_then(|q| q.regular_market_price);
        let mut chain = ExpirationChain::new(expiration, underlying_price);

        for set in &self.options {
            if unix_to_date(set.expiration_date)? != expiration {
                continue;
            }
            chain.calls.extend(set.calls.iter().map(RawContract::to_record));
            chain.puts.extend(set.puts.iter().map(RawContract::to_record));
        }

        Ok(chain)
    }
}

/// Vendor timestamps mark midnight UTC of the expiration date.
pub fn unix_to_date(ts: i64) -> Result<NaiveDate, ProviderError> {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| ProviderError::InvalidResponse(format!("timestamp out of range: {}", ts)))
}

pub fn date_to_unix(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Yahoo Finance options client.
pub struct YahooClient {
    client: Client,
    base_url: String,
    cookie_url: String,
    crumb: Option<String>,
    last_request: Instant,
    request_count: u64,
}

impl YahooClient {
    /// Create a client from provider settings.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie_url: config.cookie_url.clone(),
            crumb: None,
            last_request: Instant::now() - MIN_REQUEST_INTERVAL,
            request_count: 0,
        })
    }

    /// Get request count for monitoring.
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    async fn pace(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < MIN_REQUEST_INTERVAL {
            tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
        }
    }

    fn mark_request(&mut self) {
        self.last_request = Instant::now();
        self.request_count += 1;
    }

    /// Return the cached crumb, running the cookie + crumb handshake on first use.
    async fn ensure_crumb(&mut self) -> Result<String, ProviderError> {
        if let Some(crumb) = &self.crumb {
            return Ok(crumb.clone());
        }

        // Only the Set-Cookie header matters here; this host answers 404.
        self.pace().await;
        debug!(url = %self.cookie_url, "requesting session cookie");
        self.client.get(&self.cookie_url).send().await?;
        self.mark_request();

        self.pace().await;
        let url = format!("{}/v1/test/getcrumb", self.base_url);
        debug!(%url, "requesting crumb");
        let response = self.client.get(&url).send().await?;
        self.mark_request();

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Unauthorized(format!(
                "crumb request returned {}: {}",
                status, text
            )));
        }

        let crumb = text.trim().to_string();
        if crumb.is_empty() {
            return Err(ProviderError::Unauthorized("empty crumb".to_string()));
        }

        self.crumb = Some(crumb.clone());
        Ok(crumb)
    }

    /// Paced request helper.
    async fn request(
        &mut self,
        symbol: &str,
        expiration: Option<NaiveDate>,
    ) -> Result<OptionChainResult, ProviderError> {
        let crumb = self.ensure_crumb().await?;
        self.pace().await;

        let url = format!("{}/v7/finance/options/{}", self.base_url, symbol);
        let mut request = self.client.get(&url).query(&[("crumb", crumb.as_str())]);
        if let Some(date) = expiration {
            request = request.query(&[("date", date_to_unix(date).to_string())]);
        }

        debug!(%url, ?expiration, "requesting options chain");
        let response = request.send().await?;
        self.mark_request();

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.crumb = None;
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unauthorized(format!("{}: {}", status, text)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!("{}: {}", status, text)));
        }

        let envelope: OptionsEnvelope = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        envelope.into_result(symbol)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn expirations(&mut self, symbol: &str) -> Result<Vec<NaiveDate>, ProviderError> {
        self.request(symbol, None).await?.expirations()
    }

    async fn chain(
        &mut self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<ExpirationChain, ProviderError> {
        self.request(symbol, Some(expiration)).await?.to_chain(expiration)
    }
}
