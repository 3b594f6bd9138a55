//! Heston Calibration
//!
//! Fits (κ, θ, σ_v, ρ) to one expiry of call prices by bounded weighted
//! least squares, with v0 held fixed:
//!
//! min Σ wᵢ (C_model(Kᵢ) - C_market(Kᵢ))²,  wᵢ = 1 / (C_market(Kᵢ) + ε)
//!
//! Points that violate the Feller condition, or that the pricer cannot
//! price, score `FELLER_PENALTY`; the optimizer treats that value as
//! infeasible. A solution that still violates Feller has σ_v clamped just
//! inside the boundary.

mod heston;
mod target;

pub use heston::*;
pub use target::*;

/// Objective value returned for Feller-violating or unpriceable parameters
pub const FELLER_PENALTY: f64 = 1e10;

/// Minimum number of valid (strike, price) points
pub const MIN_CALIBRATION_POINTS: usize = 3;
