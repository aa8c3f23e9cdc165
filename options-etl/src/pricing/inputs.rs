//! Precondition checks in front of the pricer.

use thiserror::Error;

use super::black_scholes::BlackScholes;
use crate::data::OptionSide;

/// Why a contract was not priced.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SkipReason {
    #[error("missing implied volatility")]
    MissingVolatility,

    #[error("non-positive implied volatility ({0})")]
    NonPositiveVolatility(f64),

    #[error("expired or expiring today (time to maturity {0:.4})")]
    Expired(f64),

    #[error("missing underlying price")]
    MissingSpot,

    #[error("non-positive underlying price ({0})")]
    NonPositiveSpot(f64),

    #[error("non-positive strike ({0})")]
    NonPositiveStrike(f64),

    #[error("non-finite {0} ({1})")]
    NonFinite(&'static str, f64),
}

/// Raw pricer inputs as derived from a vendor row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingInputs {
    pub spot: Option<f64>,
    pub strike: f64,
    pub time_to_maturity: f64,
    pub volatility: Option<f64>,
}

/// Inputs that satisfy every pricer precondition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckedInputs {
    pub spot: f64,
    pub strike: f64,
    pub time_to_maturity: f64,
    pub volatility: f64,
}

impl PricingInputs {
    /// Volatility is checked first, so a row missing several fields reports
    /// the volatility problem.
    pub fn check(&self) -> Result<CheckedInputs, SkipReason> {
        let volatility = match self.volatility {
            None => return Err(SkipReason::MissingVolatility),
            Some(v) if v.is_nan() => return Err(SkipReason::MissingVolatility),
            Some(v) if v <= 0.0 => return Err(SkipReason::NonPositiveVolatility(v)),
            Some(v) if v.is_infinite() => return Err(SkipReason::NonFinite("volatility", v)),
            Some(v) => v,
        };

        // NaN fails every comparison below and is treated as expired.
        if !(self.time_to_maturity > 0.0) {
            return Err(SkipReason::Expired(self.time_to_maturity));
        }
        if self.time_to_maturity.is_infinite() {
            return Err(SkipReason::NonFinite("time to maturity", self.time_to_maturity));
        }

        let spot = self.spot.ok_or(SkipReason::MissingSpot)?;
        if !(spot > 0.0) {
            return Err(SkipReason::NonPositiveSpot(spot));
        }
        if spot.is_infinite() {
            return Err(SkipReason::NonFinite("underlying price", spot));
        }

        if !(self.strike > 0.0) {
            return Err(SkipReason::NonPositiveStrike(self.strike));
        }
        if self.strike.is_infinite() {
            return Err(SkipReason::NonFinite("strike", self.strike));
        }

        Ok(CheckedInputs {
            spot,
            strike: self.strike,
            time_to_maturity: self.time_to_maturity,
            volatility,
        })
    }
}

impl CheckedInputs {
    pub fn price(&self, pricer: &BlackScholes, side: OptionSide) -> f64 {
        pricer.price(
            self.spot,
            self.strike,
            self.time_to_maturity,
            self.volatility,
            side,
        )
    }
}
