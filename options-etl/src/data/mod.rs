pub mod classify;
pub mod provider;
pub mod types;
pub mod yahoo;

pub use classify::{OccSymbolClassifier, SideClassifier, SuffixClassifier};
pub use provider::{MarketDataProvider, ProviderError};
pub use types::{
    ContractRecord, ExpirationChain, InvalidSide, OptionSide, OptionsSnapshot, PricedOption,
};
pub use yahoo::YahooClient;
