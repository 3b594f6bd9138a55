//! Option chain snapshot
//!
//! One row per strike with call and put side data for a single expiry.
//! Rows arrive straight from a broker feed or CSV, so fields may be zero,
//! missing or quoted in percent; `OptionChain::valid_sides` is the one place
//! that cleans them before any aggregation runs.

use serde::{Deserialize, Serialize};

use super::error::{ExposureError, ExposureResult};
use super::option::OptionType;

/// Normalize an implied volatility quote to decimal.
///
/// Values above 1.0 are taken as percentages (25.0 -> 0.25). Non-positive
/// or non-finite values mean "no IV".
pub fn normalize_iv(iv: f64) -> Option<f64> {
    if !iv.is_finite() || iv <= 0.0 {
        return None;
    }
    Some(if iv > 1.0 { iv / 100.0 } else { iv })
}

/// Market data for one side (call or put) of a strike
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SideQuote {
    /// Open interest in contracts
    pub open_interest: f64,
    /// Implied volatility, decimal or percent
    pub implied_vol: f64,
    /// Bid price
    pub bid: Option<f64>,
    /// Ask price
    pub ask: Option<f64>,
}

impl SideQuote {
    pub fn new(open_interest: f64, implied_vol: f64) -> Self {
        Self {
            open_interest,
            implied_vol,
            bid: None,
            ask: None,
        }
    }

    /// Attach bid/ask quotes
    pub fn with_quotes(mut self, bid: f64, ask: f64) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self
    }

    /// Implied volatility as a decimal, if one is available
    pub fn iv(&self) -> Option<f64> {
        normalize_iv(self.implied_vol)
    }

    /// Mid price from a two-sided quote
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(b), Some(a)) if b.is_finite() && a.is_finite() && b >= 0.0 && a >= b => {
                Some((b + a) / 2.0)
            }
            _ => None,
        }
    }
}

/// One strike of an option chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionChainRow {
    /// Strike price
    pub strike: f64,
    /// Call side
    pub call: SideQuote,
    /// Put side
    pub put: SideQuote,
}

impl OptionChainRow {
    pub fn new(strike: f64, call: SideQuote, put: SideQuote) -> Self {
        Self { strike, call, put }
    }

    /// Side data for a given option type
    pub fn side(&self, option_type: OptionType) -> &SideQuote {
        match option_type {
            OptionType::Call => &self.call,
            OptionType::Put => &self.put,
        }
    }

    pub fn has_valid_strike(&self) -> bool {
        self.strike.is_finite() && self.strike > 0.0
    }

    /// Volatility shared by both sides of the strike.
    ///
    /// Average of call and put IV when both exist, otherwise whichever side
    /// has one.
    pub fn shared_iv(&self) -> Option<f64> {
        match (self.call.iv(), self.put.iv()) {
            (Some(c), Some(p)) => Some((c + p) / 2.0),
            (Some(c), None) => Some(c),
            (None, Some(p)) => Some(p),
            (None, None) => None,
        }
    }
}

/// A cleaned (strike, side) entry ready for aggregation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidSide {
    pub strike: f64,
    pub option_type: OptionType,
    /// Decimal implied volatility, > 0
    pub iv: f64,
    /// Open interest, > 0
    pub open_interest: f64,
}

impl ValidSide {
    /// Dealer sign: calls add, puts subtract
    pub fn sign(&self) -> f64 {
        self.option_type.phi()
    }
}

/// Option chain for a single expiry, ordered by ascending strike
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    rows: Vec<OptionChainRow>,
}

impl OptionChain {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Build a chain from unordered rows. Duplicate strikes are rejected.
    pub fn from_rows(rows: impl IntoIterator<Item = OptionChainRow>) -> ExposureResult<Self> {
        let mut rows: Vec<OptionChainRow> = rows.into_iter().collect();
        rows.sort_by(|a, b| a.strike.total_cmp(&b.strike));

        if let Some(pair) = rows.windows(2).find(|w| w[0].strike == w[1].strike) {
            return Err(ExposureError::invalid_input(format!(
                "duplicate strike {} in option chain",
                pair[0].strike
            )));
        }

        Ok(Self { rows })
    }

    /// Insert a row, replacing any existing row at the same strike
    pub fn upsert(&mut self, row: OptionChainRow) {
        match self
            .rows
            .binary_search_by(|probe| probe.strike.total_cmp(&row.strike))
        {
            Ok(idx) => self.rows[idx] = row,
            Err(idx) => self.rows.insert(idx, row),
        }
    }

    pub fn rows(&self) -> &[OptionChainRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All strikes in ascending order
    pub fn strikes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.strike).collect()
    }

    /// Row at a given strike
    pub fn row_at(&self, strike: f64) -> Option<&OptionChainRow> {
        self.rows
            .binary_search_by(|probe| probe.strike.total_cmp(&strike))
            .ok()
            .map(|idx| &self.rows[idx])
    }

    /// Strike closest to spot
    pub fn atm_strike(&self, spot: f64) -> Option<f64> {
        self.rows
            .iter()
            .filter(|r| r.has_valid_strike())
            .map(|r| r.strike)
            .min_by(|a, b| (a - spot).abs().total_cmp(&(b - spot).abs()))
    }

    /// Mean of squared IVs over every quoted call and put side.
    ///
    /// Used as the initial Heston variance v0 for a chain.
    pub fn mean_iv_variance(&self) -> Option<f64> {
        let variances: Vec<f64> = self
            .rows
            .iter()
            .flat_map(|r| [r.call.iv(), r.put.iv()])
            .flatten()
            .map(|iv| iv * iv)
            .collect();

        if variances.is_empty() {
            None
        } else {
            Some(variances.iter().sum::<f64>() / variances.len() as f64)
        }
    }

    /// Valid strikes within [lower · spot, upper · spot], ascending
    pub fn strikes_near(&self, spot: f64, lower: f64, upper: f64) -> Vec<f64> {
        self.rows
            .iter()
            .filter(|r| r.has_valid_strike())
            .map(|r| r.strike)
            .filter(|k| *k >= lower * spot && *k <= upper * spot)
            .collect()
    }

    /// Validation pass: every (strike, side) with a positive strike, IV and
    /// open interest, in ascending strike order with the call before the put.
    pub fn valid_sides(&self) -> Vec<ValidSide> {
        let mut sides = Vec::with_capacity(self.rows.len() * 2);
        let mut skipped = 0usize;

        for row in &self.rows {
            if !row.has_valid_strike() {
                skipped += 2;
                continue;
            }

            for option_type in [OptionType::Call, OptionType::Put] {
                let quote = row.side(option_type);
                let oi = quote.open_interest;

                match quote.iv() {
                    Some(iv) if oi.is_finite() && oi > 0.0 => sides.push(ValidSide {
                        strike: row.strike,
                        option_type,
                        iv,
                        open_interest: oi,
                    }),
                    _ => skipped += 1,
                }
            }
        }

        if skipped > 0 {
            tracing::debug!(
                "Chain validation kept {} sides, skipped {} without strike/IV/OI",
                sides.len(),
                skipped
            );
        }

        sides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(strike: f64, call_oi: f64, call_iv: f64, put_oi: f64, put_iv: f64) -> OptionChainRow {
        OptionChainRow::new(
            strike,
            SideQuote::new(call_oi, call_iv),
            SideQuote::new(put_oi, put_iv),
        )
    }

    #[test]
    fn test_normalize_iv() {
        assert_eq!(normalize_iv(0.25), Some(0.25));
        assert_eq!(normalize_iv(25.0), Some(0.25));
        assert_eq!(normalize_iv(1.0), Some(1.0));
        assert_eq!(normalize_iv(0.0), None);
        assert_eq!(normalize_iv(f64::NAN), None);
    }

    #[test]
    fn test_chain_ordering_and_duplicates() {
        let chain = OptionChain::from_rows(vec![
            row(110.0, 1.0, 0.2, 1.0, 0.2),
            row(90.0, 1.0, 0.2, 1.0, 0.2),
            row(100.0, 1.0, 0.2, 1.0, 0.2),
        ])
        .unwrap();
        assert_eq!(chain.strikes(), vec![90.0, 100.0, 110.0]);
        assert_eq!(chain.atm_strike(103.0), Some(100.0));

        let dup = OptionChain::from_rows(vec![
            row(100.0, 1.0, 0.2, 1.0, 0.2),
            row(100.0, 2.0, 0.3, 2.0, 0.3),
        ]);
        assert!(dup.is_err());
    }

    #[test]
    fn test_upsert_replaces_strike() {
        let mut chain = OptionChain::new();
        chain.upsert(row(100.0, 1.0, 0.2, 1.0, 0.2));
        chain.upsert(row(95.0, 1.0, 0.2, 1.0, 0.2));
        chain.upsert(row(100.0, 5.0, 0.3, 5.0, 0.3));

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.row_at(100.0).unwrap().call.open_interest, 5.0);
        assert_eq!(chain.strikes(), vec![95.0, 100.0]);
    }

    #[test]
    fn test_valid_sides_filters_and_normalizes() {
        let chain = OptionChain::from_rows(vec![
            row(-5.0, 10.0, 0.2, 10.0, 0.2),
            row(100.0, 10.0, 25.0, 0.0, 0.3),
            row(105.0, 0.0, 0.0, 7.0, 0.22),
        ])
        .unwrap();

        let sides = chain.valid_sides();
        assert_eq!(sides.len(), 2);

        assert_eq!(sides[0].strike, 100.0);
        assert_eq!(sides[0].option_type, OptionType::Call);
        assert!((sides[0].iv - 0.25).abs() < 1e-12);

        assert_eq!(sides[1].option_type, OptionType::Put);
        assert_eq!(sides[1].sign(), -1.0);
    }

    #[test]
    fn test_mean_iv_variance_and_strikes_near() {
        let chain = OptionChain::from_rows(vec![
            row(40.0, 1.0, 0.0, 1.0, 0.0),
            row(90.0, 1.0, 20.0, 1.0, 0.0),
            row(100.0, 1.0, 0.30, 1.0, 0.10),
            row(170.0, 1.0, 0.0, 1.0, 0.0),
        ])
        .unwrap();

        let v0 = chain.mean_iv_variance().unwrap();
        assert!((v0 - (0.04 + 0.09 + 0.01) / 3.0).abs() < 1e-12);
        assert_eq!(chain.strikes_near(100.0, 0.5, 1.5), vec![90.0, 100.0]);

        assert_eq!(OptionChain::new().mean_iv_variance(), None);
    }

    #[test]
    fn test_shared_iv_and_mid() {
        let both = row(100.0, 1.0, 20.0, 1.0, 0.30);
        assert!((both.shared_iv().unwrap() - 0.25).abs() < 1e-12);

        let put_only = row(100.0, 1.0, 0.0, 1.0, 0.30);
        assert_eq!(put_only.shared_iv(), Some(0.30));

        assert_eq!(row(100.0, 1.0, 0.0, 1.0, 0.0).shared_iv(), None);

        let quote = SideQuote::new(10.0, 0.2).with_quotes(2.0, 2.5);
        assert_eq!(quote.mid(), Some(2.25));
        assert_eq!(SideQuote::new(10.0, 0.2).with_quotes(2.5, 2.0).mid(), None);
    }
}
