//! Option side and market input definitions
//!
//! Everything the pricing core consumes is a plain number. `MarketInputs`
//! bundles the six Black-Scholes inputs so call sites stay readable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{ExposureError, ExposureResult};

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Payoff direction: +1 for call, -1 for put
    pub fn phi(&self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }

    /// Intrinsic value at given spot
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }

    /// Upper-case label used in exposure tables ("CALL" / "PUT")
    pub fn label(&self) -> &'static str {
        match self {
            OptionType::Call => "CALL",
            OptionType::Put => "PUT",
        }
    }
}

/// Black-Scholes market inputs for a single option
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketInputs {
    /// Spot price of the underlying
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiry in years
    pub time: f64,
    /// Continuously compounded risk-free rate
    pub rate: f64,
    /// Continuous dividend yield
    pub div_yield: f64,
    /// Volatility (decimal, 0.20 = 20%)
    pub vol: f64,
}

impl MarketInputs {
    pub fn new(spot: f64, strike: f64, time: f64, rate: f64, div_yield: f64, vol: f64) -> Self {
        Self { spot, strike, time, rate, div_yield, vol }
    }

    /// Same inputs at a different spot
    pub fn with_spot(&self, spot: f64) -> Self {
        Self { spot, ..*self }
    }

    /// Same inputs at a different volatility
    pub fn with_vol(&self, vol: f64) -> Self {
        Self { vol, ..*self }
    }

    /// True when the inputs admit a well-defined sensitivity.
    ///
    /// Expired options, zero/negative vol and non-positive spot or strike
    /// all have no sensitivity; the Greeks report 0.0 for them.
    pub fn is_degenerate(&self) -> bool {
        !(self.time > 0.0 && self.vol > 0.0 && self.spot > 0.0 && self.strike > 0.0)
    }

    /// Forward price F = S * exp((r - q) * T)
    pub fn forward(&self) -> f64 {
        self.spot * ((self.rate - self.div_yield) * self.time).exp()
    }
}

/// Days-per-year convention used for time to expiry
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Time to expiry in years, floored at one day.
///
/// Same-day and past expiries count as one day out.
pub fn time_to_expiry(expiry: NaiveDate, today: NaiveDate) -> f64 {
    let days = (expiry - today).num_days() as f64;
    (days / DAYS_PER_YEAR).max(1.0 / DAYS_PER_YEAR)
}

/// Parse an expiration key of the form `YYYY-MM-DD` or `YYYY-MM-DD:N`.
///
/// The suffix after `:` (days-to-expiry as reported by the broker feed)
/// is ignored.
pub fn parse_expiration_key(key: &str) -> ExposureResult<NaiveDate> {
    let date_part = key.split(':').next().unwrap_or_default().trim();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| ExposureError::invalid_input(format!("bad expiration '{}': {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_inputs() {
        let base = MarketInputs::new(100.0, 100.0, 0.25, 0.05, 0.0, 0.2);
        assert!(!base.is_degenerate());

        assert!(MarketInputs { time: 0.0, ..base }.is_degenerate());
        assert!(MarketInputs { vol: 0.0, ..base }.is_degenerate());
        assert!(MarketInputs { spot: 0.0, ..base }.is_degenerate());
        assert!(MarketInputs { strike: -5.0, ..base }.is_degenerate());
        assert!(MarketInputs { vol: f64::NAN, ..base }.is_degenerate());
    }

    #[test]
    fn test_time_to_expiry_floor() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let in_73_days = NaiveDate::from_ymd_opt(2025, 5, 15).unwrap();

        assert!((time_to_expiry(in_73_days, today) - 73.0 / 365.0).abs() < 1e-12);
        assert!((time_to_expiry(today, today) - 1.0 / 365.0).abs() < 1e-12);

        let yesterday = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        assert!((time_to_expiry(yesterday, today) - 1.0 / 365.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_expiration_key() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        assert_eq!(parse_expiration_key("2025-06-20:45").unwrap(), expected);
        assert_eq!(parse_expiration_key("2025-06-20").unwrap(), expected);
        assert!(parse_expiration_key("June 20").is_err());
    }
}
