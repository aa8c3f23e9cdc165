//! Option pricing.
//!
//! - Black-Scholes closed form (European, no dividends)
//! - Input checks that decide whether a contract can be priced at all

pub mod black_scholes;
pub mod inputs;

pub use black_scholes::{BlackScholes, PricingError, DEFAULT_RISK_FREE_RATE};
pub use inputs::{CheckedInputs, PricingInputs, SkipReason};
