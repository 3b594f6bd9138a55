//! Heston Monte Carlo paths and implied-volatility smile
//!
//! Euler-Maruyama with full truncation: the variance used in both drift and
//! diffusion is v⁺ = max(v, 0), and the stored variance is floored at 0.
//! Spot is stepped in log space so it stays positive.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use super::black_scholes::implied_volatility;
use super::heston::{HestonParams, HestonPricer};
use crate::config::SimulationConfig;
use crate::core::{ExposureError, ExposureResult, OptionType};

/// One point on a simulated path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub time: f64,
    pub spot: f64,
    pub variance: f64,
}

/// A single simulated path, `n_steps + 1` points starting at t = 0
pub type SimulatedPath = Vec<PathPoint>;

/// Simulated spot and variance paths on a shared time grid
#[derive(Debug, Clone, PartialEq)]
pub struct HestonPaths {
    /// Time grid, length n_steps + 1
    pub times: Array1<f64>,
    /// Spot paths, shape (n_paths, n_steps + 1)
    pub spot: Array2<f64>,
    /// Variance paths, shape (n_paths, n_steps + 1)
    pub variance: Array2<f64>,
}

impl HestonPaths {
    pub fn n_paths(&self) -> usize {
        self.spot.nrows()
    }

    pub fn n_steps(&self) -> usize {
        self.times.len().saturating_sub(1)
    }

    /// Path `index` as (time, spot, variance) points
    pub fn path(&self, index: usize) -> Option<SimulatedPath> {
        if index >= self.n_paths() {
            return None;
        }
        let spot = self.spot.row(index);
        let variance = self.variance.row(index);

        Some(
            self.times
                .iter()
                .zip(spot.iter().zip(variance.iter()))
                .map(|(&time, (&spot, &variance))| PathPoint { time, spot, variance })
                .collect(),
        )
    }

    /// Spot at the horizon for every path
    pub fn terminal_spots(&self) -> ArrayView1<'_, f64> {
        self.spot.column(self.n_steps())
    }

    /// Average terminal spot across paths
    pub fn mean_terminal_spot(&self) -> Option<f64> {
        self.terminal_spots().mean()
    }

    /// Instantaneous volatility √v along every path
    pub fn volatility_paths(&self) -> Array2<f64> {
        self.variance.mapv(f64::sqrt)
    }

    /// Mean variance at each time step, averaged over paths
    pub fn mean_variance(&self) -> Option<Array1<f64>> {
        self.variance.mean_axis(Axis(0))
    }
}

/// Simulate correlated Heston spot/variance paths.
///
/// Per step, one standard normal is drawn for every path's spot shock, then
/// one for every path's independent variance shock, so a fixed seed
/// reproduces the output exactly. `config.seed = None` seeds from OS entropy.
pub fn simulate_heston_paths(
    spot: f64,
    time: f64,
    rate: f64,
    div_yield: f64,
    params: &HestonParams,
    config: &SimulationConfig,
) -> ExposureResult<HestonPaths> {
    if !(spot > 0.0) {
        return Err(ExposureError::invalid_input("spot must be positive"));
    }
    if !(time > 0.0) {
        return Err(ExposureError::invalid_input("time horizon must be positive"));
    }
    if config.n_steps == 0 || config.n_paths == 0 {
        return Err(ExposureError::invalid_input("n_steps and n_paths must be at least 1"));
    }
    if !(params.rho >= -1.0 && params.rho <= 1.0) {
        return Err(ExposureError::invalid_input("rho must be in [-1, 1]"));
    }

    let mut rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let n_steps = config.n_steps;
    let n_paths = config.n_paths;
    let dt = time / n_steps as f64;
    let sqrt_dt = dt.sqrt();
    let rho_bar = (1.0 - params.rho * params.rho).sqrt();

    let times = Array1::from_shape_fn(n_steps + 1, |t| t as f64 * dt);
    let mut spots = Array2::<f64>::zeros((n_paths, n_steps + 1));
    let mut variances = Array2::<f64>::zeros((n_paths, n_steps + 1));
    spots.column_mut(0).fill(spot);
    variances.column_mut(0).fill(params.v0);

    let mut z1 = vec![0.0; n_paths];
    let mut z2 = vec![0.0; n_paths];

    for t in 0..n_steps {
        for z in z1.iter_mut() {
            *z = StandardNormal.sample(&mut rng);
        }
        for z in z2.iter_mut() {
            *z = StandardNormal.sample(&mut rng);
        }

        for p in 0..n_paths {
            let s = spots[[p, t]];
            let v_pos = f64::max(variances[[p, t]], 0.0);
            let sqrt_v = v_pos.sqrt();

            let dw_s = sqrt_dt * z1[p];
            let dw_v = sqrt_dt * (params.rho * z1[p] + rho_bar * z2[p]);

            let v_next = v_pos + params.kappa * (params.theta - v_pos) * dt + params.sigma_v * sqrt_v * dw_v;
            variances[[p, t + 1]] = v_next.max(0.0);
            spots[[p, t + 1]] = s * ((rate - div_yield - 0.5 * v_pos) * dt + sqrt_v * dw_s).exp();
        }
    }

    Ok(HestonPaths {
        times,
        spot: spots,
        variance: variances,
    })
}

/// Heston-implied Black-Scholes volatility for each strike.
///
/// Strikes are processed in ascending order. A strike whose Heston price or
/// Black-Scholes inversion fails is left out of the result.
pub fn implied_volatility_smile(
    spot: f64,
    strikes: &[f64],
    time: f64,
    rate: f64,
    div_yield: f64,
    params: &HestonParams,
    pricer: &HestonPricer,
) -> Vec<(f64, f64)> {
    let mut sorted = strikes.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut smile = Vec::with_capacity(sorted.len());
    for strike in sorted {
        let iv = pricer
            .call_price(spot, strike, time, rate, div_yield, params)
            .and_then(|price| {
                implied_volatility(price, spot, strike, time, rate, div_yield, OptionType::Call)
            });

        match iv {
            Ok(iv) => smile.push((strike, iv)),
            Err(e) => tracing::debug!("Dropping strike {} from Heston smile: {}", strike, e),
        }
    }

    smile
}
