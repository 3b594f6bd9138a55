//! Market data a Heston calibration fits to

use serde::{Deserialize, Serialize};

use super::MIN_CALIBRATION_POINTS;
use crate::core::{ExposureError, ExposureResult, OptionChain};

/// Call prices for one expiry plus the shared market inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTarget {
    /// (strike, market call price)
    pub points: Vec<(f64, f64)>,
    pub spot: f64,
    /// Time to expiry in years
    pub time: f64,
    pub rate: f64,
    pub div_yield: f64,
    /// Initial variance, held fixed during the fit
    pub v0: f64,
}

impl CalibrationTarget {
    pub fn new(
        points: Vec<(f64, f64)>,
        spot: f64,
        time: f64,
        rate: f64,
        div_yield: f64,
        v0: f64,
    ) -> Self {
        Self { points, spot, time, rate, div_yield, v0 }
    }

    /// Call mid prices of a chain.
    ///
    /// v0 is the mean squared IV over every quoted side of the chain.
    pub fn from_chain(
        chain: &OptionChain,
        spot: f64,
        time: f64,
        rate: f64,
        div_yield: f64,
    ) -> ExposureResult<Self> {
        let v0 = chain
            .mean_iv_variance()
            .ok_or_else(|| ExposureError::invalid_input("chain has no implied volatilities"))?;

        let points = chain
            .rows()
            .iter()
            .filter(|row| row.has_valid_strike())
            .filter_map(|row| row.call.mid().map(|mid| (row.strike, mid)))
            .collect();

        Ok(Self::new(points, spot, time, rate, div_yield, v0))
    }

    /// Same target with a different initial variance
    pub fn with_v0(mut self, v0: f64) -> Self {
        self.v0 = v0;
        self
    }

    /// Points with a positive finite strike and price
    pub fn valid_points(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .copied()
            .filter(|(k, p)| k.is_finite() && *k > 0.0 && p.is_finite() && *p > 0.0)
            .collect()
    }

    /// Check the shared inputs and the point count
    pub fn validate(&self) -> ExposureResult<()> {
        if !(self.spot > 0.0) {
            return Err(ExposureError::invalid_input("spot must be positive"));
        }
        if !(self.time > 0.0) {
            return Err(ExposureError::invalid_input("time to expiry must be positive"));
        }
        if !(self.v0 > 0.0) {
            return Err(ExposureError::invalid_input("v0 must be positive"));
        }

        let found = self.valid_points().len();
        if found < MIN_CALIBRATION_POINTS {
            return Err(ExposureError::InsufficientData {
                required: MIN_CALIBRATION_POINTS,
                found,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OptionChainRow, SideQuote};

    #[test]
    fn test_valid_points_filter() {
        let target = CalibrationTarget::new(
            vec![(90.0, 12.0), (0.0, 5.0), (100.0, 0.0), (105.0, f64::NAN), (110.0, 1.5)],
            100.0,
            0.5,
            0.03,
            0.0,
            0.04,
        );
        assert_eq!(target.valid_points(), vec![(90.0, 12.0), (110.0, 1.5)]);

        let err = target.validate().unwrap_err();
        assert_eq!(err, ExposureError::InsufficientData { required: 3, found: 2 });
    }

    #[test]
    fn test_from_chain_uses_call_mids() {
        let quoted = |oi: f64, iv: f64, bid: f64, ask: f64| SideQuote::new(oi, iv).with_quotes(bid, ask);
        let chain = OptionChain::from_rows(vec![
            OptionChainRow::new(95.0, quoted(10.0, 0.22, 7.0, 7.4), SideQuote::new(10.0, 0.24)),
            OptionChainRow::new(100.0, quoted(10.0, 0.20, 4.0, 4.2), SideQuote::new(10.0, 0.20)),
            OptionChainRow::new(105.0, SideQuote::new(10.0, 0.18), SideQuote::new(10.0, 0.18)),
        ])
        .unwrap();

        let target = CalibrationTarget::from_chain(&chain, 100.0, 0.25, 0.05, 0.0).unwrap();
        assert_eq!(target.points.len(), 2);
        assert!((target.points[0].1 - 7.2).abs() < 1e-12);
        assert!((target.points[1].1 - 4.1).abs() < 1e-12);
        assert!(target.v0 > 0.03 && target.v0 < 0.06);

        assert!(CalibrationTarget::from_chain(&OptionChain::new(), 100.0, 0.25, 0.05, 0.0).is_err());
    }
}
