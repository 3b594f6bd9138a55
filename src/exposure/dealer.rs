//! Per-strike dealer exposures

use serde::{Deserialize, Serialize};

use super::{ExposureRow, CONTRACT_MULTIPLIER};
use crate::core::{ExposureGreek, Greeks, MarketInputs, OptionChain, OptionType, ValidSide};
use crate::models::black_scholes;

/// Dollar gamma per 1% move: gamma · OI · 100 · S² · 0.01
pub fn gamma_exposure(gamma: f64, spot: f64, open_interest: f64) -> f64 {
    gamma * open_interest * CONTRACT_MULTIPLIER * spot * spot * 0.01
}

/// vanna · OI · 100 · S · σ
pub fn vanna_exposure(vanna: f64, spot: f64, iv: f64, open_interest: f64) -> f64 {
    vanna * open_interest * CONTRACT_MULTIPLIER * spot * iv
}

/// volga · OI · vega
pub fn volga_exposure(volga: f64, vega: f64, open_interest: f64) -> f64 {
    volga * open_interest * vega
}

/// charm · OI · 100 · S
pub fn charm_exposure(charm: f64, spot: f64, open_interest: f64) -> f64 {
    charm * open_interest * CONTRACT_MULTIPLIER * spot
}

fn side_inputs(side: &ValidSide, spot: f64, time: f64, rate: f64, div_yield: f64) -> MarketInputs {
    MarketInputs::new(spot, side.strike, time, rate, div_yield, side.iv)
}

/// Signed exposure of one validated side.
///
/// Gamma keeps its natural sign. Vanna, volga and charm use the magnitude of
/// the Greek so every call adds and every put subtracts.
fn side_exposure(
    greek: ExposureGreek,
    side: &ValidSide,
    spot: f64,
    time: f64,
    rate: f64,
    div_yield: f64,
) -> f64 {
    let inputs = side_inputs(side, spot, time, rate, div_yield);
    let oi = side.open_interest;
    let sign = side.sign();

    match greek {
        ExposureGreek::Gamma => {
            sign * gamma_exposure(black_scholes::gamma(&inputs), spot, oi)
        }
        ExposureGreek::Vanna => {
            sign * vanna_exposure(black_scholes::vanna(&inputs).abs(), spot, side.iv, oi)
        }
        ExposureGreek::Volga => {
            let vega = black_scholes::vega(&inputs);
            sign * volga_exposure(black_scholes::volga(&inputs).abs(), vega, oi)
        }
        ExposureGreek::Charm => {
            sign * charm_exposure(black_scholes::charm(&inputs).abs(), spot, oi)
        }
    }
}

/// One exposure row per valid (strike, side), in ascending strike order with
/// the call before the put.
pub fn chain_exposures(
    chain: &OptionChain,
    spot: f64,
    time: f64,
    rate: f64,
    div_yield: f64,
    greek: ExposureGreek,
) -> Vec<ExposureRow> {
    chain
        .valid_sides()
        .iter()
        .map(|side| ExposureRow {
            strike: side.strike,
            side: side.option_type,
            exposure: side_exposure(greek, side, spot, time, rate, div_yield),
        })
        .collect()
}

/// Open-interest-weighted Greeks summed over the chain, calls minus puts
pub fn net_greeks(chain: &OptionChain, spot: f64, time: f64, rate: f64, div_yield: f64) -> Greeks {
    chain
        .valid_sides()
        .iter()
        .map(|side| {
            let inputs = side_inputs(side, spot, time, rate, div_yield);
            black_scholes::greeks(&inputs).scale(side.sign() * side.open_interest)
        })
        .fold(Greeks::default(), |acc, g| acc.add(&g))
}

/// Totals of a set of exposure rows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureSummary {
    pub greek: ExposureGreek,
    /// Sum of all rows
    pub total: f64,
    pub call_total: f64,
    pub put_total: f64,
    /// Strike with the largest absolute net exposure
    pub peak_strike: Option<f64>,
}

impl ExposureSummary {
    pub fn from_rows(greek: ExposureGreek, rows: &[ExposureRow]) -> Self {
        let (call_total, put_total) = rows.iter().fold((0.0, 0.0), |(c, p), row| match row.side {
            OptionType::Call => (c + row.exposure, p),
            OptionType::Put => (c, p + row.exposure),
        });

        // Rows are strike-ordered, so per-strike nets are adjacent
        let mut peak: Option<(f64, f64)> = None;
        let mut i = 0;
        while i < rows.len() {
            let strike = rows[i].strike;
            let mut net = 0.0;
            while i < rows.len() && rows[i].strike == strike {
                net += rows[i].exposure;
                i += 1;
            }
            if peak.map_or(true, |(_, best)| net.abs() > best.abs()) {
                peak = Some((strike, net));
            }
        }

        Self {
            greek,
            total: call_total + put_total,
            call_total,
            put_total,
            peak_strike: peak.map(|(strike, _)| strike),
        }
    }

    /// Total in billions, as shown on the exposure chart
    pub fn total_billions(&self) -> f64 {
        self.total / 1e9
    }
}
