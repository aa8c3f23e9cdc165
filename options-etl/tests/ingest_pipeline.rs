// tests/ingest_pipeline.rs
//
// End-to-end ingestion against an in-memory provider and SQLite store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use options_etl::data::{
    ContractRecord, ExpirationChain, MarketDataProvider, OptionSide, PricedOption, ProviderError,
    SuffixClassifier,
};
use options_etl::ingest::{IngestError, Ingestor};
use options_etl::pricing::{BlackScholes, SkipReason};
use options_etl::store::{OptionSink, SqliteStore, StoreError};

// =============================================================================
// Fixtures
// =============================================================================

struct StaticProvider {
    chains: Vec<ExpirationChain>,
    fail_on: Option<NaiveDate>,
    requests: usize,
}

impl StaticProvider {
    fn new(chains: Vec<ExpirationChain>) -> Self {
        Self {
            chains,
            fail_on: None,
            requests: 0,
        }
    }
}

#[async_trait]
impl MarketDataProvider for StaticProvider {
    async fn expirations(&mut self, _symbol: &str) -> Result<Vec<NaiveDate>, ProviderError> {
        self.requests += 1;
        Ok(self.chains.iter().map(|c| c.expiration).collect())
    }

    async fn chain(
        &mut self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<ExpirationChain, ProviderError> {
        self.requests += 1;
        if self.fail_on == Some(expiration) {
            return Err(ProviderError::ApiError("503 Service Unavailable".to_string()));
        }
        self.chains
            .iter()
            .find(|c| c.expiration == expiration)
            .cloned()
            .ok_or_else(|| ProviderError::NoData {
                symbol: symbol.to_string(),
            })
    }
}

/// Sink that rejects one contract and stores everything else in memory.
#[derive(Default)]
struct FlakySink {
    reject: String,
    rows: Vec<PricedOption>,
}

impl OptionSink for FlakySink {
    fn insert(&mut self, option: &PricedOption) -> Result<i64, StoreError> {
        if option.contract_symbol == self.reject {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.rows.push(option.clone());
        Ok(self.rows.len() as i64)
    }
}

fn contract(symbol: &str, strike: f64, iv: Option<f64>) -> ContractRecord {
    ContractRecord {
        contract_symbol: symbol.to_string(),
        strike,
        last_price: Some(2.5),
        implied_volatility: iv,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
}

/// Two expirations: one a year out, one that expires on the evaluation day.
fn nvda_chains() -> Vec<ExpirationChain> {
    let mut year_out = ExpirationChain::new(date(2025, 1, 1), Some(100.0));
    year_out.calls = vec![
        contract("NVDA250101C00100000", 100.0, Some(0.2)),
        contract("NVDA250101C00110000", 110.0, Some(0.0)),
    ];
    year_out.puts = vec![
        contract("NVDA250101P00100000", 100.0, Some(0.2)),
        contract("NVDA250101P00090000", 90.0, None),
    ];

    let mut same_day = ExpirationChain::new(date(2024, 1, 2), Some(100.0));
    same_day.calls = vec![contract("NVDA240102C00100000", 100.0, Some(0.3))];

    vec![year_out, same_day]
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_ingest_stores_priced_rows() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut ingestor = Ingestor::new(
        StaticProvider::new(nvda_chains()),
        store,
        BlackScholes::new(0.03),
    );

    let report = ingestor.run_at("nvda", as_of()).await.unwrap();

    assert_eq!(report.symbol, "NVDA");
    assert_eq!(report.expirations, 2);
    assert_eq!(report.records_seen, 5);
    assert_eq!(report.stored_count(), 2);
    assert_eq!(report.skipped_count(), 3);
    assert_eq!(report.failed_count(), 0);

    let rows = ingestor.sink().rows_for_symbol("NVDA").unwrap();
    assert_eq!(rows.len(), 2);

    let call = &rows[0];
    assert_eq!(call.strike_price, 100.0);
    assert_eq!(call.current_price, 100.0);
    assert_eq!(call.risk_free_rate, 0.03);
    assert_eq!(call.volatility, 0.2);
    assert_eq!(call.expiration_date, date(2025, 1, 1));
    assert!((call.time_to_maturity - 1.0).abs() < 1e-12);
    assert!((call.call_price.unwrap() - 9.4134).abs() < 1e-3);
    assert_eq!(call.put_price, None);

    let put = &rows[1];
    assert_eq!(put.call_price, None);
    assert!((put.put_price.unwrap() - 6.4580).abs() < 1e-3);

    // Put-call parity on the stored pair.
    let parity = 100.0 - 100.0 * (-0.03f64).exp();
    assert!((call.call_price.unwrap() - put.put_price.unwrap() - parity).abs() < 1e-9);
}

#[tokio::test]
async fn test_skip_policy_reports_each_record_once() {
    let mut ingestor = Ingestor::new(
        StaticProvider::new(nvda_chains()),
        SqliteStore::open_in_memory().unwrap(),
        BlackScholes::default(),
    );

    let report = ingestor.run_at("NVDA", as_of()).await.unwrap();

    let reasons: Vec<_> = report
        .skipped
        .iter()
        .map(|s| (s.contract_symbol.as_str(), s.strike, s.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("NVDA250101C00110000", 110.0, SkipReason::NonPositiveVolatility(0.0)),
            ("NVDA250101P00090000", 90.0, SkipReason::MissingVolatility),
            ("NVDA240102C00100000", 100.0, SkipReason::Expired(0.0)),
        ]
    );

    let stored = ingestor.sink().rows_for_symbol("NVDA").unwrap();
    assert!(stored
        .iter()
        .all(|r| r.strike_price == 100.0 && r.expiration_date == date(2025, 1, 1)));
}

#[tokio::test]
async fn test_infinite_volatility_is_skipped_not_stored() {
    let mut chain = ExpirationChain::new(date(2025, 1, 1), Some(100.0));
    chain.calls = vec![
        contract("NVDA250101C00100000", 100.0, Some(f64::INFINITY)),
        contract("NVDA250101C00105000", 105.0, Some(0.25)),
    ];

    let mut ingestor = Ingestor::new(
        StaticProvider::new(vec![chain]),
        SqliteStore::open_in_memory().unwrap(),
        BlackScholes::default(),
    );

    let report = ingestor.run_at("NVDA", as_of()).await.unwrap();

    assert_eq!(report.stored_count(), 1);
    assert_eq!(report.failed_count(), 0);
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::NonFinite("volatility", f64::INFINITY)
    );

    let rows = ingestor.sink().rows_for_symbol("NVDA").unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].call_price.unwrap().is_finite());
}

#[tokio::test]
async fn test_missing_underlying_price_skips_chain() {
    let mut chain = ExpirationChain::new(date(2025, 1, 1), None);
    chain.calls = vec![contract("SPY250101C00400000", 400.0, Some(0.2))];

    let mut ingestor = Ingestor::new(
        StaticProvider::new(vec![chain]),
        SqliteStore::open_in_memory().unwrap(),
        BlackScholes::default(),
    );

    let report = ingestor.run_at("SPY", as_of()).await.unwrap();
    assert_eq!(report.stored_count(), 0);
    assert_eq!(report.skipped[0].reason, SkipReason::MissingSpot);
}

#[tokio::test]
async fn test_persistence_failure_continues_with_next_record() {
    let sink = FlakySink {
        reject: "NVDA250101C00100000".to_string(),
        ..Default::default()
    };
    let mut ingestor = Ingestor::new(
        StaticProvider::new(nvda_chains()),
        sink,
        BlackScholes::default(),
    );

    let report = ingestor.run_at("NVDA", as_of()).await.unwrap();

    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.failed[0].contract_symbol, "NVDA250101C00100000");
    assert_eq!(report.stored_count(), 1);

    let (_, sink) = ingestor.into_parts();
    assert_eq!(sink.rows.len(), 1);
    assert_eq!(sink.rows[0].contract_symbol, "NVDA250101P00100000");
    assert_eq!(sink.rows[0].side, OptionSide::Put);
}

#[tokio::test]
async fn test_fetch_failure_aborts_without_writing() {
    let mut provider = StaticProvider::new(nvda_chains());
    provider.fail_on = Some(date(2024, 1, 2));

    let mut ingestor = Ingestor::new(
        provider,
        SqliteStore::open_in_memory().unwrap(),
        BlackScholes::default(),
    );

    let err = ingestor.run_at("NVDA", as_of()).await.unwrap_err();
    match err {
        IngestError::Fetch { symbol, source } => {
            assert_eq!(symbol, "NVDA");
            assert!(matches!(source, ProviderError::ApiError(_)));
        }
        other => panic!("unexpected error: {other}"),
    }

    // The first chain was fetched but nothing is written before the snapshot completes.
    assert_eq!(ingestor.sink().count().unwrap(), 0);
    assert_eq!(ingestor.provider().requests, 3);
}

#[tokio::test]
async fn test_empty_symbol_rejected() {
    let mut ingestor = Ingestor::new(
        StaticProvider::new(vec![]),
        SqliteStore::open_in_memory().unwrap(),
        BlackScholes::default(),
    );

    let err = ingestor.run_at("   ", as_of()).await.unwrap_err();
    assert!(matches!(err, IngestError::EmptySymbol));
    assert_eq!(ingestor.provider().requests, 0);
}

#[tokio::test]
async fn test_rerun_appends_rows() {
    let mut ingestor = Ingestor::new(
        StaticProvider::new(nvda_chains()),
        SqliteStore::open_in_memory().unwrap(),
        BlackScholes::default(),
    );

    ingestor.run_at("NVDA", as_of()).await.unwrap();
    let later = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
    ingestor.run_at("NVDA", later).await.unwrap();

    let rows = ingestor.sink().rows_for_symbol("NVDA").unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows[2].time_to_maturity < rows[0].time_to_maturity);
    assert_ne!(rows[2].call_price, rows[0].call_price);
}

#[tokio::test]
async fn test_alternate_classifier() {
    let mut chain = ExpirationChain::new(date(2025, 1, 1), Some(100.0));
    chain.calls = vec![contract("NVDA250101C00100000", 100.0, Some(0.2))];

    let mut ingestor = Ingestor::new(
        StaticProvider::new(vec![chain]),
        FlakySink::default(),
        BlackScholes::default(),
    )
    .with_classifier(SuffixClassifier);

    ingestor.run_at("NVDA", as_of()).await.unwrap();

    let (_, sink) = ingestor.into_parts();
    // Plain suffix rule: the identifier ends in a digit, so it is read as a put.
    assert_eq!(sink.rows[0].side, OptionSide::Put);
}
