//! Ingestion pipeline.
//!
//! Runs one pass for one underlying:
//! 1. Fetch every expiration chain from the provider (any failure aborts)
//! 2. For each contract, classify the side from its identifier
//! 3. Derive pricer inputs and apply the skip policy
//! 4. Price with Black-Scholes
//! 5. Append the row to the sink (failures are logged, the loop continues)

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::{
    ContractRecord, ExpirationChain, MarketDataProvider, OccSymbolClassifier, OptionSide,
    OptionsSnapshot, PricedOption, ProviderError, SideClassifier,
};
use crate::pricing::{BlackScholes, PricingInputs, SkipReason};
use crate::store::OptionSink;

/// Days per year used for time to maturity.
const DAYS_PER_YEAR: f64 = 365.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Symbol must not be empty")]
    EmptySymbol,

    #[error("Failed to fetch options data for {symbol}: {source}")]
    Fetch {
        symbol: String,
        #[source]
        source: ProviderError,
    },
}

/// A contract that was not priced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub contract_symbol: String,
    pub strike: f64,
    pub expiration: NaiveDate,
    #[serde(serialize_with = "serialize_display")]
    pub reason: SkipReason,
}

/// A priced contract whose row could not be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedInsert {
    pub contract_symbol: String,
    pub strike: f64,
    pub error: String,
}

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub symbol: String,
    pub evaluated_at: DateTime<Utc>,
    pub risk_free_rate: f64,
    pub expirations: usize,
    pub records_seen: usize,
    /// Row ids written, in insertion order
    pub stored: Vec<i64>,
    pub skipped: Vec<SkippedRecord>,
    pub failed: Vec<FailedInsert>,
}

impl IngestReport {
    fn new(symbol: &str, evaluated_at: DateTime<Utc>, risk_free_rate: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            evaluated_at,
            risk_free_rate,
            expirations: 0,
            records_seen: 0,
            stored: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn stored_count(&self) -> usize {
        self.stored.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} @ {}: {} expirations, {} contracts, {} stored, {} skipped, {} failed",
            self.symbol,
            self.evaluated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.expirations,
            self.records_seen,
            self.stored_count(),
            self.skipped_count(),
            self.failed_count()
        )
    }
}

fn serialize_display<S: serde::Serializer>(
    value: &SkipReason,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Years from `as_of` until midnight UTC of `expiration`.
///
/// Zero or negative once that instant has passed.
pub fn time_to_maturity(expiration: NaiveDate, as_of: DateTime<Utc>) -> f64 {
    let expires_at = expiration.and_time(NaiveTime::MIN).and_utc();
    (expires_at - as_of).num_seconds() as f64 / SECONDS_PER_DAY / DAYS_PER_YEAR
}

/// Price one contract, or say why it cannot be priced.
pub fn price_contract(
    symbol: &str,
    chain: &ExpirationChain,
    record: &ContractRecord,
    side: OptionSide,
    pricer: &BlackScholes,
    as_of: DateTime<Utc>,
) -> Result<PricedOption, SkipReason> {
    let inputs = PricingInputs {
        spot: chain.underlying_price,
        strike: record.strike,
        time_to_maturity: time_to_maturity(chain.expiration, as_of),
        volatility: record.implied_volatility,
    }
    .check()?;

    Ok(PricedOption {
        symbol: symbol.to_string(),
        contract_symbol: record.contract_symbol.clone(),
        side,
        strike: inputs.strike,
        spot: inputs.spot,
        time_to_maturity: inputs.time_to_maturity,
        risk_free_rate: pricer.rate,
        volatility: inputs.volatility,
        theoretical_price: inputs.price(pricer, side),
        expiration_date: chain.expiration,
    })
}

/// Fetch, price and store options chains for one underlying at a time.
pub struct Ingestor<P, S, C = OccSymbolClassifier> {
    provider: P,
    sink: S,
    classifier: C,
    pricer: BlackScholes,
}

impl<P, S> Ingestor<P, S, OccSymbolClassifier>
where
    P: MarketDataProvider,
    S: OptionSink,
{
    pub fn new(provider: P, sink: S, pricer: BlackScholes) -> Self {
        Self {
            provider,
            sink,
            classifier: OccSymbolClassifier,
            pricer,
        }
    }
}

impl<P, S, C> Ingestor<P, S, C>
where
    P: MarketDataProvider,
    S: OptionSink,
    C: SideClassifier,
{
    /// Swap in a different identifier convention.
    pub fn with_classifier<C2: SideClassifier>(self, classifier: C2) -> Ingestor<P, S, C2> {
        Ingestor {
            provider: self.provider,
            sink: self.sink,
            classifier,
            pricer: self.pricer,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn into_parts(self) -> (P, S) {
        (self.provider, self.sink)
    }

    /// Run one pass evaluated at the current time.
    pub async fn run(&mut self, symbol: &str) -> Result<IngestReport, IngestError> {
        self.run_at(symbol, Utc::now()).await
    }

    /// Run one pass with time to maturity measured from `as_of`.
    pub async fn run_at(
        &mut self,
        symbol: &str,
        as_of: DateTime<Utc>,
    ) -> Result<IngestReport, IngestError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(IngestError::EmptySymbol);
        }

        info!(%symbol, %as_of, rate = self.pricer.rate, "fetching options chains");
        let snapshot = self
            .provider
            .snapshot(&symbol)
            .await
            .map_err(|source| IngestError::Fetch {
                symbol: symbol.clone(),
                source,
            })?;

        let report = self.ingest_snapshot(&snapshot, as_of);
        info!("{}", report.summary());
        Ok(report)
    }

    /// Price and store every contract in an already fetched snapshot.
    pub fn ingest_snapshot(
        &mut self,
        snapshot: &OptionsSnapshot,
        as_of: DateTime<Utc>,
    ) -> IngestReport {
        let symbol = snapshot.symbol.as_str();
        let mut report = IngestReport::new(symbol, as_of, self.pricer.rate);
        report.expirations = snapshot.chains.len();

        for chain in &snapshot.chains {
            debug!(
                %symbol,
                expiration = %chain.expiration,
                contracts = chain.len(),
                "pricing chain"
            );

            for record in chain.contracts() {
                report.records_seen += 1;
                let side = self.classifier.classify(&record.contract_symbol);

                let priced =
                    match price_contract(symbol, chain, record, side, &self.pricer, as_of) {
                        Ok(priced) => priced,
                        Err(reason) => {
                            warn!(
                                %symbol,
                                strike = record.strike,
                                contract = %record.contract_symbol,
                                %reason,
                                "skipping option"
                            );
                            report.skipped.push(SkippedRecord {
                                contract_symbol: record.contract_symbol.clone(),
                                strike: record.strike,
                                expiration: chain.expiration,
                                reason,
                            });
                            continue;
                        }
                    };

                match self.sink.insert(&priced) {
                    Ok(id) => report.stored.push(id),
                    Err(e) => {
                        warn!(
                            %symbol,
                            strike = record.strike,
                            contract = %record.contract_symbol,
                            error = %e,
                            "failed to store option"
                        );
                        report.failed.push(FailedInsert {
                            contract_symbol: record.contract_symbol.clone(),
                            strike: record.strike,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        report
    }
}
