//! Core data types for options-chain ingestion.
//!
//! Vendor rows come in as [`ContractRecord`]s grouped into an
//! [`ExpirationChain`] per expiration date; every contract that survives the
//! skip policy leaves the pipeline as a [`PricedOption`].

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected side name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid option side '{0}': expected call or put")]
pub struct InvalidSide(pub String);

/// Option side (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    /// Single-letter marker used in OCC contract symbols.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "C",
            Self::Put => "P",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl FromStr for OptionSide {
    type Err = InvalidSide;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "C" | "CALL" => Ok(Self::Call),
            "P" | "PUT" => Ok(Self::Put),
            _ => Err(InvalidSide(s.to_string())),
        }
    }
}

impl fmt::Display for OptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single contract row as delivered by the market-data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Vendor contract identifier (e.g., "NVDA240101C00100000")
    pub contract_symbol: String,

    /// Strike price
    pub strike: f64,

    /// Last traded price of the contract itself
    pub last_price: Option<f64>,

    /// Annualized implied volatility, if the vendor reported one
    pub implied_volatility: Option<f64>,
}

/// All contracts for one expiration date.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpirationChain {
    /// Expiration date for this chain
    pub expiration: NaiveDate,

    /// Underlying last traded price reported alongside the chain
    pub underlying_price: Option<f64>,

    pub calls: Vec<ContractRecord>,
    pub puts: Vec<ContractRecord>,
}

impl ExpirationChain {
    /// Create a new empty chain.
    pub fn new(expiration: NaiveDate, underlying_price: Option<f64>) -> Self {
        Self {
            expiration,
            underlying_price,
            calls: Vec::new(),
            puts: Vec::new(),
        }
    }

    /// Calls first, then puts, in vendor order.
    pub fn contracts(&self) -> impl Iterator<Item = &ContractRecord> {
        self.calls.iter().chain(self.puts.iter())
    }

    pub fn len(&self) -> usize {
        self.calls.len() + self.puts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}

/// Every expiration fetched for one underlying in a single pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsSnapshot {
    /// Underlying symbol, uppercase
    pub symbol: String,

    /// Chains in the order the provider listed their expirations
    pub chains: Vec<ExpirationChain>,
}

impl OptionsSnapshot {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            chains: Vec::new(),
        }
    }

    /// Get chain for a specific expiration.
    pub fn chain_at_expiration(&self, expiration: NaiveDate) -> Option<&ExpirationChain> {
        self.chains.iter().find(|c| c.expiration == expiration)
    }

    /// Total number of contract records in this snapshot.
    pub fn total_contracts(&self) -> usize {
        self.chains.iter().map(ExpirationChain::len).sum()
    }
}

/// A contract priced with Black-Scholes, ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedOption {
    /// Underlying symbol
    pub symbol: String,

    pub contract_symbol: String,
    pub side: OptionSide,
    pub strike: f64,

    /// Underlying price used as spot
    pub spot: f64,

    /// Years until expiration at evaluation time
    pub time_to_maturity: f64,

    pub risk_free_rate: f64,
    pub volatility: f64,
    pub theoretical_price: f64,
    pub expiration_date: NaiveDate,
}

impl PricedOption {
    /// Theoretical price if this is a call.
    pub fn call_price(&self) -> Option<f64> {
        match self.side {
            OptionSide::Call => Some(self.theoretical_price),
            OptionSide::Put => None,
        }
    }

    /// Theoretical price if this is a put.
    pub fn put_price(&self) -> Option<f64> {
        match self.side {
            OptionSide::Call => None,
            OptionSide::Put => Some(self.theoretical_price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(symbol: &str, strike: f64) -> ContractRecord {
        ContractRecord {
            contract_symbol: symbol.to_string(),
            strike,
            last_price: Some(1.0),
            implied_volatility: Some(0.3),
        }
    }

    #[test]
    fn test_option_side_parsing() {
        assert_eq!("C".parse::<OptionSide>(), Ok(OptionSide::Call));
        assert_eq!("P".parse::<OptionSide>(), Ok(OptionSide::Put));
        assert_eq!("call".parse::<OptionSide>(), Ok(OptionSide::Call));
        assert_eq!(" PUT ".parse::<OptionSide>(), Ok(OptionSide::Put));
        assert_eq!(
            "straddle".parse::<OptionSide>(),
            Err(InvalidSide("straddle".to_string()))
        );
    }

    #[test]
    fn test_chain_contracts_calls_before_puts() {
        let expiration = NaiveDate::from_ymd_opt(2024, 1, 19).unwrap();
        let mut chain = ExpirationChain::new(expiration, Some(100.0));
        chain.puts.push(record("SPY240119P00100000", 100.0));
        chain.calls.push(record("SPY240119C00095000", 95.0));
        chain.calls.push(record("SPY240119C00100000", 100.0));

        let order: Vec<_> = chain.contracts().map(|c| c.contract_symbol.as_str()).collect();
        assert_eq!(
            order,
            vec!["SPY240119C00095000", "SPY240119C00100000", "SPY240119P00100000"]
        );
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_priced_option_populates_one_side() {
        let mut option = PricedOption {
            symbol: "SPY".to_string(),
            contract_symbol: "SPY240119C00100000".to_string(),
            side: OptionSide::Call,
            strike: 100.0,
            spot: 101.0,
            time_to_maturity: 0.1,
            risk_free_rate: 0.03,
            volatility: 0.2,
            theoretical_price: 3.2,
            expiration_date: NaiveDate::from_ymd_opt(2024, 1, 19).unwrap(),
        };
        assert_eq!(option.call_price(), Some(3.2));
        assert_eq!(option.put_price(), None);

        option.side = OptionSide::Put;
        assert_eq!(option.call_price(), None);
        assert_eq!(option.put_price(), Some(3.2));
    }
}
