//! Gamma flip (zero-gamma) search
//!
//! Net dealer gamma is evaluated on an inclusive, equally spaced spot grid.
//! The flip is reported as the midpoint of the first adjacent pair of grid
//! points whose values have strictly opposite signs, scanning upward. The
//! search never extrapolates beyond the grid.

use serde::{Deserialize, Serialize};

use super::dealer::gamma_exposure;
use crate::config::ExposureConfig;
use crate::core::{MarketInputs, OptionChain, ValidSide};
use crate::models::black_scholes;

/// `steps` equally spaced points from `min` to `max` inclusive
fn spot_grid(min: f64, max: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let width = (max - min) / (steps - 1) as f64;
            (0..steps)
                .map(|i| if i == steps - 1 { max } else { min + width * i as f64 })
                .collect()
        }
    }
}

fn net_gamma(sides: &[ValidSide], spot: f64, time: f64, rate: f64, div_yield: f64) -> f64 {
    sides
        .iter()
        .map(|side| {
            let inputs = MarketInputs::new(spot, side.strike, time, rate, div_yield, side.iv);
            side.sign() * gamma_exposure(black_scholes::gamma(&inputs), spot, side.open_interest)
        })
        .sum()
}

/// Net dealer gamma exposure at a hypothetical spot: calls minus puts
pub fn total_gamma_at_spot(
    chain: &OptionChain,
    spot: f64,
    time: f64,
    rate: f64,
    div_yield: f64,
) -> f64 {
    net_gamma(&chain.valid_sides(), spot, time, rate, div_yield)
}

/// Spot at which net dealer gamma changes sign, if it does within
/// [spot_min, spot_max]
pub fn find_zero_gamma(
    chain: &OptionChain,
    spot_min: f64,
    spot_max: f64,
    steps: usize,
    time: f64,
    rate: f64,
    div_yield: f64,
) -> Option<f64> {
    let sides = chain.valid_sides();
    let mut prev: Option<(f64, f64)> = None;

    for spot in spot_grid(spot_min, spot_max, steps) {
        let gamma = net_gamma(&sides, spot, time, rate, div_yield);
        if let Some((prev_spot, prev_gamma)) = prev {
            if gamma * prev_gamma < 0.0 {
                let flip = (prev_spot + spot) / 2.0;
                tracing::debug!("Gamma flip between {:.2} and {:.2}", prev_spot, spot);
                return Some(flip);
            }
        }
        prev = Some((spot, gamma));
    }

    tracing::debug!("No gamma flip in [{:.2}, {:.2}]", spot_min, spot_max);
    None
}

/// Zero-gamma search over spot·(1 ± spot_range_pct) with the configured grid
/// size, rate and dividend yield
pub fn find_zero_gamma_around(
    chain: &OptionChain,
    spot: f64,
    time: f64,
    config: &ExposureConfig,
) -> Option<f64> {
    find_zero_gamma(
        chain,
        spot * (1.0 - config.spot_range_pct),
        spot * (1.0 + config.spot_range_pct),
        config.grid_steps,
        time,
        config.risk_free_rate,
        config.dividend_yield,
    )
}

/// Net gamma exposure across a spot grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaProfile {
    pub spots: Vec<f64>,
    pub net_gamma: Vec<f64>,
}

impl GammaProfile {
    fn first_crossing(&self) -> Option<usize> {
        self.net_gamma.windows(2).position(|w| w[0] * w[1] < 0.0)
    }

    /// Midpoint of the first bracketing pair (same rule as `find_zero_gamma`)
    pub fn zero_gamma(&self) -> Option<f64> {
        self.first_crossing()
            .map(|i| (self.spots[i] + self.spots[i + 1]) / 2.0)
    }

    /// Linear interpolation of the first crossing
    pub fn interpolated_flip(&self) -> Option<f64> {
        self.first_crossing().map(|i| {
            let (s0, s1) = (self.spots[i], self.spots[i + 1]);
            let (g0, g1) = (self.net_gamma[i], self.net_gamma[i + 1]);
            s0 - g0 * (s1 - s0) / (g1 - g0)
        })
    }

    /// Grid point with the largest absolute net gamma
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.spots
            .iter()
            .copied()
            .zip(self.net_gamma.iter().copied())
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
    }
}

/// Net gamma at every point of an inclusive spot grid
pub fn gamma_profile(
    chain: &OptionChain,
    spot_min: f64,
    spot_max: f64,
    steps: usize,
    time: f64,
    rate: f64,
    div_yield: f64,
) -> GammaProfile {
    let sides = chain.valid_sides();
    let spots = spot_grid(spot_min, spot_max, steps);
    let net_gamma = spots
        .iter()
        .map(|&spot| net_gamma(&sides, spot, time, rate, div_yield))
        .collect();

    GammaProfile { spots, net_gamma }
}
