pub mod config;
pub mod data;
pub mod ingest;
pub mod pricing;
pub mod store;

// Re-export commonly used types
pub use config::{AppConfig, ConfigError};
pub use data::{
    ContractRecord, ExpirationChain, MarketDataProvider, OccSymbolClassifier, OptionSide,
    OptionsSnapshot, PricedOption, ProviderError, SideClassifier, YahooClient,
};
pub use ingest::{IngestError, IngestReport, Ingestor};
pub use pricing::{BlackScholes, PricingError, SkipReason};
pub use store::{OptionSink, SqliteStore, StoreError};
