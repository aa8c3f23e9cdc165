//! Black-Scholes closed-form pricing for European options without dividends.
//!
//! - d1 = (ln(S/K) + (r + 0.5 * vol^2) * T) / (vol * sqrt(T))
//! - d2 = d1 - vol * sqrt(T)
//! - call = S * N(d1) - K * e^(-rT) * N(d2)
//! - put  = K * e^(-rT) * N(-d2) - S * N(-d1)
//!
//! Inputs must satisfy `spot > 0`, `strike > 0`, `time > 0`, `vol > 0`; see
//! [`super::PricingInputs`] for the checked entry point.

use std::f64::consts::SQRT_2;

use statrs::function::erf::erfc;
use thiserror::Error;

use crate::data::{InvalidSide, OptionSide};

/// Risk-free rate used when nothing else is configured.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.03;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error(transparent)]
    InvalidSide(#[from] InvalidSide),
}

/// Black-Scholes calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackScholes {
    /// Risk-free interest rate (annualized, continuous)
    pub rate: f64,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

impl BlackScholes {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    fn d1(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let numerator = (spot / strike).ln() + (self.rate + 0.5 * vol * vol) * time;
        numerator / (vol * time.sqrt())
    }

    fn d2(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        self.d1(spot, strike, time, vol) - vol * time.sqrt()
    }

    /// Standard normal CDF.
    fn norm_cdf(x: f64) -> f64 {
        0.5 * erfc(-x / SQRT_2)
    }

    /// Present value of the strike.
    fn discounted_strike(&self, strike: f64, time: f64) -> f64 {
        strike * (-self.rate * time).exp()
    }

    pub fn call_price(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let d1 = self.d1(spot, strike, time, vol);
        let d2 = self.d2(spot, strike, time, vol);

        spot * Self::norm_cdf(d1) - self.discounted_strike(strike, time) * Self::norm_cdf(d2)
    }

    pub fn put_price(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let d1 = self.d1(spot, strike, time, vol);
        let d2 = self.d2(spot, strike, time, vol);

        self.discounted_strike(strike, time) * Self::norm_cdf(-d2) - spot * Self::norm_cdf(-d1)
    }

    /// Calculate option price based on side.
    pub fn price(&self, spot: f64, strike: f64, time: f64, vol: f64, side: OptionSide) -> f64 {
        match side {
            OptionSide::Call => self.call_price(spot, strike, time, vol),
            OptionSide::Put => self.put_price(spot, strike, time, vol),
        }
    }

    /// Price with the side given by name ("call"/"put", or "C"/"P").
    pub fn price_named(
        &self,
        spot: f64,
        strike: f64,
        time: f64,
        vol: f64,
        side: &str,
    ) -> Result<f64, PricingError> {
        let side: OptionSide = side.parse()?;
        Ok(self.price(spot, strike, time, vol, side))
    }
}
