//! Box-constrained quasi-Newton minimization
//!
//! Projected L-BFGS: the search direction comes from the usual two-loop
//! recursion restricted to the free variables, trial points are projected
//! back into the box, and a backtracking Armijo line search accepts steps.
//! Gradients are finite differences, central where both bumps stay inside
//! the box and feasible, one-sided otherwise.
//!
//! Objective values at or above `LbfgsOptions::infeasible_threshold` mark
//! infeasible points: the line search backs away from them and the gradient
//! never differences across them.
//!
//! Both stopping tests are scale-free: the objective reduction is relative to
//! the current objective, and the projected gradient is measured against the
//! objective at the start point. An objective that is tiny everywhere (a
//! price-weighted calibration error, say) is therefore minimized as fully as
//! one of order 1.

use std::collections::VecDeque;

use crate::core::{ExposureError, ExposureResult};

/// Lower/upper bounds per coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct BoxConstraints {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl BoxConstraints {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> ExposureResult<Self> {
        if lower.len() != upper.len() {
            return Err(ExposureError::invalid_input(
                "lower and upper bounds have different dimensions",
            ));
        }
        if lower.iter().zip(&upper).any(|(l, u)| !(l <= u)) {
            return Err(ExposureError::invalid_input(
                "every lower bound must be <= its upper bound",
            ));
        }
        Ok(Self { lower, upper })
    }

    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(v, (l, u))| v.clamp(*l, *u))
            .collect()
    }

    fn at_lower(&self, x: &[f64], i: usize) -> bool {
        x[i] <= self.lower[i]
    }

    fn at_upper(&self, x: &[f64], i: usize) -> bool {
        x[i] >= self.upper[i]
    }
}

/// Why the optimizer stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    GradientTolerance,
    ObjectiveTolerance,
    MaxIterations,
    LineSearchFailure,
}

impl TerminationReason {
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            TerminationReason::GradientTolerance | TerminationReason::ObjectiveTolerance
        )
    }

    pub fn message(&self) -> &'static str {
        match self {
            TerminationReason::GradientTolerance => {
                "CONVERGENCE: NORM_OF_PROJECTED_GRADIENT_<=_PGTOL"
            }
            TerminationReason::ObjectiveTolerance => {
                "CONVERGENCE: REL_REDUCTION_OF_F_<=_FACTR*EPSMCH"
            }
            TerminationReason::MaxIterations => "STOP: TOTAL NO. OF ITERATIONS REACHED LIMIT",
            TerminationReason::LineSearchFailure => "ABNORMAL_TERMINATION_IN_LNSRCH",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LbfgsOptions {
    pub max_iterations: usize,
    /// Stop when the infinity norm of the projected gradient is below this
    /// times |f_0| (or below this alone when f_0 is zero)
    pub gradient_tolerance: f64,
    /// Stop when (f_k - f_{k+1}) / max(|f_k|, |f_{k+1}|) is below this
    pub objective_tolerance: f64,
    /// Relative finite-difference bump
    pub finite_diff_epsilon: f64,
    /// Number of stored correction pairs
    pub history: usize,
    /// Objective values >= this are infeasible
    pub infeasible_threshold: f64,
    pub max_line_search_steps: usize,
}

impl Default for LbfgsOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            gradient_tolerance: 1e-8,
            objective_tolerance: 2.2e-9,
            finite_diff_epsilon: 1e-4,
            history: 10,
            infeasible_threshold: f64::INFINITY,
            max_line_search_steps: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimisationResult {
    pub x: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
    pub objective_evaluations: usize,
    pub reason: TerminationReason,
}

impl OptimisationResult {
    pub fn converged(&self) -> bool {
        self.reason.is_converged()
    }
}

struct Evaluator<F> {
    objective: F,
    evaluations: usize,
    threshold: f64,
}

impl<F> Evaluator<F>
where
    F: FnMut(&[f64]) -> f64,
{
    fn eval(&mut self, x: &[f64]) -> f64 {
        self.evaluations += 1;
        (self.objective)(x)
    }

    /// Value if feasible and finite
    fn feasible(&mut self, x: &[f64]) -> Option<f64> {
        let v = self.eval(x);
        (v.is_finite() && v < self.threshold).then_some(v)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn finite_difference_gradient<F>(
    x: &[f64],
    fx: f64,
    bounds: &BoxConstraints,
    eps: f64,
    evaluator: &mut Evaluator<F>,
) -> Vec<f64>
where
    F: FnMut(&[f64]) -> f64,
{
    let mut grad = vec![0.0; x.len()];
    let mut probe = x.to_vec();

    for i in 0..x.len() {
        let h = (x[i].abs() * eps).max(eps * 1e-2);

        let up = x[i] + h;
        let f_up = if up <= bounds.upper[i] {
            probe[i] = up;
            evaluator.feasible(&probe)
        } else {
            None
        };

        let down = x[i] - h;
        let f_down = if down >= bounds.lower[i] {
            probe[i] = down;
            evaluator.feasible(&probe)
        } else {
            None
        };

        probe[i] = x[i];

        grad[i] = match (f_up, f_down) {
            (Some(fu), Some(fd)) => (fu - fd) / (2.0 * h),
            (Some(fu), None) => (fu - fx) / h,
            (None, Some(fd)) => (fx - fd) / h,
            (None, None) => 0.0,
        };
    }

    grad
}

/// Variables pinned at a bound with the gradient pushing outward
fn active_set(x: &[f64], grad: &[f64], bounds: &BoxConstraints) -> Vec<bool> {
    (0..x.len())
        .map(|i| {
            (bounds.at_lower(x, i) && grad[i] > 0.0) || (bounds.at_upper(x, i) && grad[i] < 0.0)
        })
        .collect()
}

fn projected_gradient_norm(x: &[f64], grad: &[f64], bounds: &BoxConstraints) -> f64 {
    let stepped: Vec<f64> = x.iter().zip(grad).map(|(xi, gi)| xi - gi).collect();
    bounds
        .clamp(&stepped)
        .iter()
        .zip(x)
        .map(|(p, xi)| (p - xi).abs())
        .fold(0.0, f64::max)
}

/// Two-loop recursion on the free variables
fn lbfgs_direction(grad: &[f64], active: &[bool], pairs: &VecDeque<(Vec<f64>, Vec<f64>, f64)>) -> Vec<f64> {
    let mask = |v: &[f64]| -> Vec<f64> {
        v.iter()
            .zip(active)
            .map(|(x, fixed)| if *fixed { 0.0 } else { *x })
            .collect()
    };

    let mut q = mask(grad);
    let mut alphas = Vec::with_capacity(pairs.len());

    for (s, y, rho) in pairs.iter().rev() {
        let s = mask(s);
        let y = mask(y);
        let alpha = rho * dot(&s, &q);
        for (qi, yi) in q.iter_mut().zip(&y) {
            *qi -= alpha * yi;
        }
        alphas.push(alpha);
    }

    if let Some((s, y, _)) = pairs.back() {
        let yy = dot(y, y);
        if yy > 0.0 {
            let scale = dot(s, y) / yy;
            q.iter_mut().for_each(|qi| *qi *= scale);
        }
    }

    for ((s, y, rho), alpha) in pairs.iter().zip(alphas.iter().rev()) {
        let s = mask(s);
        let y = mask(y);
        let beta = rho * dot(&y, &q);
        for (qi, si) in q.iter_mut().zip(&s) {
            *qi += si * (alpha - beta);
        }
    }

    mask(&q).into_iter().map(|v| -v).collect()
}

/// Minimize `objective` over the box `bounds`, starting from `initial`
/// (projected into the box first).
pub fn minimize_lbfgs_b<F>(
    initial: &[f64],
    bounds: &BoxConstraints,
    options: LbfgsOptions,
    objective: F,
) -> ExposureResult<OptimisationResult>
where
    F: FnMut(&[f64]) -> f64,
{
    if initial.len() != bounds.dimension() {
        return Err(ExposureError::invalid_input(
            "initial point dimension does not match bounds",
        ));
    }

    let mut evaluator = Evaluator {
        objective,
        evaluations: 0,
        threshold: options.infeasible_threshold,
    };

    let mut x = bounds.clamp(initial);
    let mut fx = evaluator.eval(&x);
    if !fx.is_finite() {
        return Err(ExposureError::numerical("objective is not finite at the initial point"));
    }
    let gradient_scale = if fx != 0.0 { fx.abs() } else { 1.0 };
    let gradient_tolerance = options.gradient_tolerance * gradient_scale;

    let eps = options.finite_diff_epsilon.max(1e-10);
    let mut grad = finite_difference_gradient(&x, fx, bounds, eps, &mut evaluator);
    let mut pairs: VecDeque<(Vec<f64>, Vec<f64>, f64)> = VecDeque::with_capacity(options.history);
    let mut iterations = 0usize;
    let mut reason = TerminationReason::MaxIterations;

    while iterations < options.max_iterations {
        if projected_gradient_norm(&x, &grad, bounds) <= gradient_tolerance {
            reason = TerminationReason::GradientTolerance;
            break;
        }
        iterations += 1;

        let active = active_set(&x, &grad, bounds);
        let mut direction = lbfgs_direction(&grad, &active, &pairs);
        if dot(&direction, &grad) >= 0.0 {
            pairs.clear();
            direction = lbfgs_direction(&grad, &active, &pairs);
        }

        // Without curvature history the step length is unscaled; start small.
        let mut step = if pairs.is_empty() {
            let norm = dot(&direction, &direction).sqrt();
            if norm > 0.0 { (1.0 / norm).min(1.0) } else { 1.0 }
        } else {
            1.0
        };

        let mut accepted = None;
        for _ in 0..options.max_line_search_steps {
            let trial: Vec<f64> = x.iter().zip(&direction).map(|(xi, di)| xi + step * di).collect();
            let trial = bounds.clamp(&trial);
            let moved: Vec<f64> = trial.iter().zip(&x).map(|(t, xi)| t - xi).collect();

            if moved.iter().all(|m| *m == 0.0) {
                break;
            }

            if let Some(f_trial) = evaluator.feasible(&trial) {
                if f_trial <= fx + 1e-4 * dot(&grad, &moved) {
                    accepted = Some((trial, f_trial));
                    break;
                }
            }
            step *= 0.5;
        }

        let Some((x_new, f_new)) = accepted else {
            if pairs.is_empty() {
                reason = TerminationReason::LineSearchFailure;
                break;
            }
            // Stale curvature; retry once from steepest descent
            pairs.clear();
            continue;
        };

        let grad_new = finite_difference_gradient(&x_new, f_new, bounds, eps, &mut evaluator);
        let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = grad_new.iter().zip(&grad).map(|(a, b)| a - b).collect();
        let sy = dot(&s, &y);
        if sy > f64::EPSILON * dot(&y, &y) && sy > 0.0 {
            if pairs.len() == options.history.max(1) {
                pairs.pop_front();
            }
            pairs.push_back((s, y, 1.0 / sy));
        }

        let scale = fx.abs().max(f_new.abs());
        let reduction = if scale > 0.0 { (fx - f_new) / scale } else { 0.0 };

        x = x_new;
        fx = f_new;
        grad = grad_new;

        if reduction <= options.objective_tolerance {
            reason = TerminationReason::ObjectiveTolerance;
            break;
        }
    }

    Ok(OptimisationResult {
        x,
        objective: fx,
        iterations,
        objective_evaluations: evaluator.evaluations,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rosenbrock(x: &[f64]) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    #[test]
    fn test_unconstrained_quadratic() {
        let bounds = BoxConstraints::new(vec![-10.0, -10.0], vec![10.0, 10.0]).unwrap();
        let result = minimize_lbfgs_b(&[5.0, -3.0], &bounds, LbfgsOptions::default(), |x| {
            (x[0] - 1.0).powi(2) + 4.0 * (x[1] + 2.0).powi(2)
        })
        .unwrap();

        assert!(result.converged(), "{:?}", result.reason);
        assert!((result.x[0] - 1.0).abs() < 1e-3);
        assert!((result.x[1] + 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_rosenbrock() {
        let bounds = BoxConstraints::new(vec![-2.0, -2.0], vec![2.0, 2.0]).unwrap();
        let options = LbfgsOptions {
            max_iterations: 500,
            ..Default::default()
        };
        let result = minimize_lbfgs_b(&[-1.2, 1.0], &bounds, options, rosenbrock).unwrap();

        assert!(result.objective < 1e-5, "objective {}", result.objective);
        assert!((result.x[0] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_active_bound() {
        // Unconstrained minimum at (3, 0); box caps x0 at 1
        let bounds = BoxConstraints::new(vec![-1.0, -1.0], vec![1.0, 1.0]).unwrap();
        let result = minimize_lbfgs_b(&[0.0, 0.5], &bounds, LbfgsOptions::default(), |x| {
            (x[0] - 3.0).powi(2) + x[1] * x[1]
        })
        .unwrap();

        assert_eq!(result.x[0], 1.0);
        assert!(result.x[1].abs() < 1e-3);
    }

    #[test]
    fn test_routes_around_infeasible_region() {
        // Penalize x0 + x1 > 1; constrained minimum of (x0-2)² + (x1-2)² is (0.5, 0.5)
        let bounds = BoxConstraints::new(vec![-5.0, -5.0], vec![5.0, 5.0]).unwrap();
        let options = LbfgsOptions {
            infeasible_threshold: 1e10,
            ..Default::default()
        };
        let result = minimize_lbfgs_b(&[0.0, 0.0], &bounds, options, |x| {
            if x[0] + x[1] > 1.0 {
                1e10
            } else {
                (x[0] - 2.0).powi(2) + (x[1] - 2.0).powi(2)
            }
        })
        .unwrap();

        assert!(result.objective < 1e10);
        assert!(result.x[0] + result.x[1] <= 1.0);
        assert!(result.objective < 5.0);
    }

    #[test]
    fn test_small_objective_is_fully_minimized() {
        // Same quadratic shrunk to the size of a price-weighted calibration
        // error: every accepted step improves it by far less than 2.2e-9
        let bounds = BoxConstraints::new(vec![0.0, 0.0], vec![10.0, 10.0]).unwrap();
        let result = minimize_lbfgs_b(&[2.0, 2.0], &bounds, LbfgsOptions::default(), |x| {
            1e-7 * ((x[0] - 3.0).powi(2) + 0.1 * (x[1] - 5.0).powi(2))
        })
        .unwrap();

        assert!(result.converged(), "{:?}", result.reason);
        assert!((result.x[0] - 3.0).abs() < 1e-3, "x0 {}", result.x[0]);
        assert!((result.x[1] - 5.0).abs() < 1e-3, "x1 {}", result.x[1]);
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(BoxConstraints::new(vec![1.0], vec![0.0]).is_err());
        assert!(BoxConstraints::new(vec![0.0, 0.0], vec![1.0]).is_err());
    }
}
