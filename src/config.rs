//! Configuration for the pricing, calibration, exposure and simulation stages
//!
//! Every struct has a `Default` matching the dashboard's behavior, so callers
//! only override what they need. `EngineConfig::from_json` accepts partial
//! documents; absent fields keep their defaults.

use serde::{Deserialize, Serialize};

use crate::core::ExposureResult;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Heston characteristic-function pricer
    pub pricer: PricerConfig,
    /// Heston calibration
    pub calibration: CalibrationConfig,
    /// Dealer exposure aggregation
    pub exposure: ExposureConfig,
    /// Monte Carlo path simulation
    pub simulation: SimulationConfig,
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON configuration document
    pub fn from_json(json: &str) -> ExposureResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> ExposureResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Tighter quadrature and more optimizer iterations; slower
    pub fn high_precision() -> Self {
        Self {
            pricer: PricerConfig {
                quadrature: QuadratureConfig {
                    tolerance: 1e-9,
                    max_subdivisions: 500,
                    ..Default::default()
                },
                ..Default::default()
            },
            calibration: CalibrationConfig {
                max_iterations: 400,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Adaptive quadrature settings for the Heston probability integrals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadratureConfig {
    /// Upper integration bound in frequency space.
    /// Default: 100
    pub upper_limit: f64,

    /// Absolute and relative error tolerance.
    /// Default: 1e-6
    pub tolerance: f64,

    /// Maximum number of interval subdivisions before giving up.
    /// Default: 200
    pub max_subdivisions: usize,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self {
            upper_limit: 100.0,
            tolerance: 1e-6,
            max_subdivisions: 200,
        }
    }
}

/// Branch of the Heston characteristic function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacteristicFormulation {
    /// Heston (1993): g built from `+d`, growing `exp(d·T)` terms.
    ///
    /// The complex logarithm in this form crosses its branch cut once
    /// vol-of-vol and maturity are large, and prices come back `Ok` but
    /// wrong. With κ=0.5, θ=0.04, σ_v=0.9, ρ=-0.9 at the money it prices
    /// 9.17 against 13.84 at T=3 and 16.33 against 19.93 at T=5; at T=10
    /// the quadrature fails. Prefer `LittleTrap` for long-dated, high
    /// vol-of-vol parameters.
    #[default]
    Original,
    /// Albrecher et al. (2007) "little trap": decaying `exp(-d·T)` terms
    LittleTrap,
}

/// Heston pricer configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricerConfig {
    pub quadrature: QuadratureConfig,
    pub formulation: CharacteristicFormulation,
}

/// Box bounds for the calibrated Heston parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterBounds {
    pub kappa: (f64, f64),
    pub theta: (f64, f64),
    pub sigma_v: (f64, f64),
    pub rho: (f64, f64),
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self {
            kappa: (0.1, 10.0),
            theta: (0.001, 0.5),
            sigma_v: (0.01, 1.0),
            rho: (-0.99, 0.99),
        }
    }
}

impl ParameterBounds {
    /// Lower bounds in (kappa, theta, sigma_v, rho) order
    pub fn lower(&self) -> Vec<f64> {
        vec![self.kappa.0, self.theta.0, self.sigma_v.0, self.rho.0]
    }

    /// Upper bounds in (kappa, theta, sigma_v, rho) order
    pub fn upper(&self) -> Vec<f64> {
        vec![self.kappa.1, self.theta.1, self.sigma_v.1, self.rho.1]
    }
}

/// Starting point for calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialGuess {
    pub kappa: f64,
    pub theta: f64,
    pub sigma_v: f64,
    pub rho: f64,
}

impl Default for InitialGuess {
    fn default() -> Self {
        Self {
            kappa: 2.0,
            theta: 0.04,
            sigma_v: 0.3,
            rho: -0.7,
        }
    }
}

impl InitialGuess {
    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.kappa, self.theta, self.sigma_v, self.rho]
    }
}

/// Heston calibration configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub bounds: ParameterBounds,
    pub initial_guess: InitialGuess,

    /// Added to the market price in the inverse-price weight 1/(price + eps).
    /// Default: 1e-8
    pub price_epsilon: f64,

    /// Maximum optimizer iterations.
    /// Default: 200
    pub max_iterations: usize,

    /// Projected-gradient norm, relative to the objective at the start
    /// point, at which the optimizer stops.
    /// Default: 1e-8
    pub gradient_tolerance: f64,

    /// Relative objective reduction at which the optimizer stops.
    /// Default: 2.2e-9
    pub objective_tolerance: f64,

    /// Relative bump for finite-difference gradients.
    /// Default: 1e-4
    pub finite_diff_epsilon: f64,

    /// Number of L-BFGS correction pairs kept.
    /// Default: 10
    pub history: usize,

    /// Fraction of the Feller bound sqrt(2·kappa·theta) that sigma_v is
    /// clamped to when the optimum violates the condition.
    /// Default: 0.99
    pub feller_clamp_factor: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            bounds: ParameterBounds::default(),
            initial_guess: InitialGuess::default(),
            price_epsilon: 1e-8,
            max_iterations: 200,
            gradient_tolerance: 1e-8,
            objective_tolerance: 2.2e-9,
            finite_diff_epsilon: 1e-4,
            history: 10,
            feller_clamp_factor: 0.99,
        }
    }
}

/// Dealer exposure configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureConfig {
    /// Half-width of the zero-gamma search window as a fraction of spot.
    /// Default: 0.10 (spot ± 10%)
    pub spot_range_pct: f64,

    /// Number of grid points in the zero-gamma search.
    /// Default: 60
    pub grid_steps: usize,

    /// Risk-free rate.
    /// Default: 0.05
    pub risk_free_rate: f64,

    /// Dividend yield.
    /// Default: 0.015
    pub dividend_yield: f64,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            spot_range_pct: 0.10,
            grid_steps: 60,
            risk_free_rate: 0.05,
            dividend_yield: 0.015,
        }
    }
}

/// Monte Carlo simulation configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Time steps per path.
    /// Default: 252
    pub n_steps: usize,

    /// Number of paths.
    /// Default: 1
    pub n_paths: usize,

    /// RNG seed; `None` draws from OS entropy.
    /// Default: None
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_steps: 252,
            n_paths: 1,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_dashboard() {
        let config = EngineConfig::default();
        assert_eq!(config.pricer.quadrature.upper_limit, 100.0);
        assert_eq!(config.pricer.quadrature.max_subdivisions, 200);
        assert_eq!(config.pricer.formulation, CharacteristicFormulation::Original);
        assert_eq!(config.calibration.bounds.kappa, (0.1, 10.0));
        assert_eq!(config.calibration.initial_guess.rho, -0.7);
        assert_eq!(config.exposure.spot_range_pct, 0.10);
        assert_eq!(config.exposure.grid_steps, 60);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "pricer": { "formulation": "LittleTrap", "quadrature": { "tolerance": 1e-8 } },
            "simulation": { "seed": 7 }
        }"#;

        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.pricer.formulation, CharacteristicFormulation::LittleTrap);
        assert_eq!(config.pricer.quadrature.tolerance, 1e-8);
        assert_eq!(config.pricer.quadrature.upper_limit, 100.0);
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.n_steps, 252);
        assert_eq!(config.calibration, CalibrationConfig::default());
    }

    #[test]
    fn test_bad_json_is_serialization_error() {
        let err = EngineConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, crate::core::ExposureError::Serialization(_)));
    }
}
