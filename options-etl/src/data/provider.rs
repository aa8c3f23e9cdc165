//! Market-data provider boundary.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use super::types::{ExpirationChain, OptionsSnapshot};

/// Provider errors.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("No options data available for {symbol}")]
    NoData { symbol: String },
}

/// Source of options-chain data for a single underlying.
#[async_trait]
pub trait MarketDataProvider: Send {
    /// Expiration dates listed for `symbol`, nearest first.
    async fn expirations(&mut self, symbol: &str) -> Result<Vec<NaiveDate>, ProviderError>;

    /// Calls and puts for one expiration.
    async fn chain(
        &mut self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<ExpirationChain, ProviderError>;

    /// Fetch every listed expiration, one request after another.
    ///
    /// Any failure aborts the whole snapshot.
    async fn snapshot(&mut self, symbol: &str) -> Result<OptionsSnapshot, ProviderError> {
        let expirations = self.expirations(symbol).await?;
        let mut snapshot = OptionsSnapshot::new(symbol);

        for expiration in expirations {
            let chain = self.chain(symbol, expiration).await?;
            snapshot.chains.push(chain);
        }

        Ok(snapshot)
    }
}
