//! Bounded least-squares fit of Heston parameters

use serde::{Deserialize, Serialize};

use super::{CalibrationTarget, FELLER_PENALTY};
use crate::config::CalibrationConfig;
use crate::core::{ExposureError, ExposureResult};
use crate::math::{minimize_lbfgs_b, BoxConstraints, LbfgsOptions};
use crate::models::{HestonParams, HestonPricer};

/// Outcome of a Heston calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub params: HestonParams,
    /// Whether the optimizer reported convergence
    pub converged: bool,
    /// Weighted squared price error at `params`
    pub objective: f64,
    pub iterations: usize,
    /// Optimizer termination message
    pub message: String,
    /// σ_v was clamped to restore the Feller condition after the fit
    pub feller_clamped: bool,
}

fn params_from_vec(x: &[f64], v0: f64) -> HestonParams {
    HestonParams::new(x[0], x[1], x[2], x[3], v0)
}

/// Weighted squared price error of `params` against the target's valid points.
///
/// Returns `FELLER_PENALTY` if the parameters violate the Feller condition
/// or any price fails.
pub fn weighted_price_error(
    target: &CalibrationTarget,
    params: &HestonParams,
    pricer: &HestonPricer,
    price_epsilon: f64,
) -> f64 {
    if !params.feller_condition() {
        return FELLER_PENALTY;
    }

    let mut total = 0.0;
    for (strike, market) in target.valid_points() {
        let model = match pricer.call_price(
            target.spot,
            strike,
            target.time,
            target.rate,
            target.div_yield,
            params,
        ) {
            Ok(price) if price.is_finite() => price,
            _ => return FELLER_PENALTY,
        };
        let weight = 1.0 / (market + price_epsilon);
        total += weight * (model - market).powi(2);
    }
    total
}

/// Pull σ_v to `factor · sqrt(2κθ)` when the Feller condition fails.
///
/// Returns the (possibly) adjusted parameters and whether a clamp happened.
pub fn enforce_feller(params: HestonParams, factor: f64) -> (HestonParams, bool) {
    if params.feller_condition() {
        return (params, false);
    }
    let sigma_v = (2.0 * params.kappa * params.theta).sqrt() * factor;
    (HestonParams { sigma_v, ..params }, true)
}

/// Calibrate κ, θ, σ_v and ρ to the target's call prices
pub fn calibrate_heston(
    target: &CalibrationTarget,
    config: &CalibrationConfig,
    pricer: &HestonPricer,
) -> ExposureResult<CalibrationResult> {
    target.validate()?;

    let bounds = BoxConstraints::new(config.bounds.lower(), config.bounds.upper())?;

    // Feasible start
    let start = params_from_vec(&bounds.clamp(&config.initial_guess.to_vec()), target.v0);
    let (start, start_clamped) = enforce_feller(start, config.feller_clamp_factor);
    if start_clamped {
        tracing::warn!(
            "Initial guess violates Feller; starting from sigma_v = {:.4}",
            start.sigma_v
        );
    }
    let x0 = bounds.clamp(&[start.kappa, start.theta, start.sigma_v, start.rho]);

    tracing::info!(
        "Calibrating Heston to {} prices (S={:.2}, T={:.4}, v0={:.4})",
        target.valid_points().len(),
        target.spot,
        target.time,
        target.v0
    );

    let options = LbfgsOptions {
        max_iterations: config.max_iterations,
        gradient_tolerance: config.gradient_tolerance,
        objective_tolerance: config.objective_tolerance,
        finite_diff_epsilon: config.finite_diff_epsilon,
        history: config.history,
        infeasible_threshold: FELLER_PENALTY,
        ..Default::default()
    };

    let outcome = minimize_lbfgs_b(&x0, &bounds, options, |x| {
        weighted_price_error(target, &params_from_vec(x, target.v0), pricer, config.price_epsilon)
    })?;

    if outcome.objective >= FELLER_PENALTY {
        return Err(ExposureError::calibration(format!(
            "no priceable Feller-consistent parameters found after {} iterations",
            outcome.iterations
        )));
    }

    let fitted = params_from_vec(&outcome.x, target.v0);
    let (params, feller_clamped) = enforce_feller(fitted, config.feller_clamp_factor);

    let objective = if feller_clamped {
        tracing::warn!(
            "Calibrated sigma_v {:.4} violates Feller; clamped to {:.4}",
            fitted.sigma_v,
            params.sigma_v
        );
        weighted_price_error(target, &params, pricer, config.price_epsilon)
    } else {
        outcome.objective
    };

    tracing::info!(
        "Heston calibration finished after {} iterations: objective {:.3e}, {}",
        outcome.iterations,
        objective,
        outcome.reason.message()
    );

    Ok(CalibrationResult {
        params,
        converged: outcome.converged(),
        objective,
        iterations: outcome.iterations,
        message: outcome.reason.message().to_string(),
        feller_clamped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, InitialGuess, PricerConfig, QuadratureConfig};

    const SPOT: f64 = 100.0;
    const TIME: f64 = 0.5;
    const RATE: f64 = 0.03;

    fn true_params() -> HestonParams {
        // 2κθ = 0.15 > σ² = 0.1225
        HestonParams::new(1.5, 0.05, 0.35, -0.6, 0.05)
    }

    fn synthetic_target(params: &HestonParams) -> CalibrationTarget {
        priced_target(params, &HestonPricer::default())
    }

    fn priced_target(params: &HestonParams, pricer: &HestonPricer) -> CalibrationTarget {
        let points = (0..9)
            .map(|i| {
                let strike = 80.0 + 5.0 * i as f64;
                let price = pricer.call_price(SPOT, strike, TIME, RATE, 0.0, params).unwrap();
                (strike, price)
            })
            .collect();
        CalibrationTarget::new(points, SPOT, TIME, RATE, 0.0, params.v0)
    }

    #[test]
    fn test_objective_penalizes_feller_violation() {
        let target = synthetic_target(&true_params());
        let pricer = HestonPricer::default();

        let violating = HestonParams::new(0.5, 0.02, 0.8, -0.5, 0.05);
        assert_eq!(weighted_price_error(&target, &violating, &pricer, 1e-8), FELLER_PENALTY);

        let exact = weighted_price_error(&target, &true_params(), &pricer, 1e-8);
        assert!(exact < 1e-12);
    }

    #[test]
    fn test_enforce_feller() {
        let (kept, clamped) = enforce_feller(true_params(), 0.99);
        assert!(!clamped);
        assert_eq!(kept, true_params());

        let (fixed, clamped) = enforce_feller(HestonParams::new(1.0, 0.04, 0.5, -0.7, 0.04), 0.99);
        assert!(clamped);
        assert!((fixed.sigma_v - 0.08_f64.sqrt() * 0.99).abs() < 1e-12);
        assert!(fixed.feller_condition());
    }

    #[test]
    fn test_insufficient_data() {
        let target = CalibrationTarget::new(vec![(95.0, 7.0), (100.0, 4.0)], SPOT, TIME, RATE, 0.0, 0.04);
        let err = calibrate_heston(&target, &CalibrationConfig::default(), &HestonPricer::default()).unwrap_err();
        assert_eq!(err, ExposureError::InsufficientData { required: 3, found: 2 });
    }

    #[test]
    fn test_start_at_truth_stays_put() {
        let truth = true_params();
        let target = synthetic_target(&truth);
        let config = CalibrationConfig {
            initial_guess: InitialGuess {
                kappa: truth.kappa,
                theta: truth.theta,
                sigma_v: truth.sigma_v,
                rho: truth.rho,
            },
            ..Default::default()
        };

        let result = calibrate_heston(&target, &config, &HestonPricer::default()).unwrap();
        let p = result.params;

        assert!((p.kappa - truth.kappa).abs() / truth.kappa < 0.1);
        assert!((p.theta - truth.theta).abs() / truth.theta < 0.1);
        assert!((p.sigma_v - truth.sigma_v).abs() / truth.sigma_v < 0.1);
        assert!((p.rho - truth.rho).abs() < 0.1);
        assert!(result.objective < 1e-6);
    }

    #[test]
    fn test_recovers_parameters_away_from_initial_guess() {
        // Default guess is (2.0, 0.04, 0.3, -0.7); 2κθ = 0.36 ≫ σ² = 0.09
        let truth = HestonParams::new(3.0, 0.06, 0.3, -0.5, 0.05);
        let pricer = HestonPricer::new(EngineConfig::high_precision().pricer);
        let target = priced_target(&truth, &pricer);

        let result = calibrate_heston(&target, &CalibrationConfig::default(), &pricer).unwrap();
        let p = result.params;

        let rel = |fit: f64, exact: f64| (fit - exact).abs() / exact.abs();
        assert!(rel(p.kappa, truth.kappa) < 0.1, "kappa {}", p.kappa);
        assert!(rel(p.theta, truth.theta) < 0.1, "theta {}", p.theta);
        assert!(rel(p.sigma_v, truth.sigma_v) < 0.1, "sigma_v {}", p.sigma_v);
        assert!(rel(p.rho, truth.rho) < 0.1, "rho {}", p.rho);
        assert!(!result.feller_clamped);
    }

    #[test]
    fn test_unpriceable_target_is_calibration_error() {
        let target = synthetic_target(&true_params());
        let failing = HestonPricer::new(PricerConfig {
            quadrature: QuadratureConfig {
                tolerance: 1e-15,
                max_subdivisions: 1,
                ..Default::default()
            },
            ..Default::default()
        });

        let err = calibrate_heston(&target, &CalibrationConfig::default(), &failing).unwrap_err();
        assert!(matches!(err, ExposureError::Calibration(_)), "{:?}", err);
    }

    #[test]
    fn test_round_trip_from_default_guess() {
        let truth = true_params();
        let target = synthetic_target(&truth);
        let config = CalibrationConfig::default();

        let result = calibrate_heston(&target, &config, &HestonPricer::default()).unwrap();
        let p = result.params;

        assert!(result.objective < 1e-3, "objective {}", result.objective);
        assert!(p.feller_condition());
        assert!(p.rho < 0.0);
        assert_eq!(p.v0, truth.v0);

        let lower = config.bounds.lower();
        let upper = config.bounds.upper();
        for (value, (lo, hi)) in [p.kappa, p.theta, p.sigma_v, p.rho].iter().zip(lower.iter().zip(&upper)) {
            assert!(value >= lo && value <= hi);
        }
    }
}
