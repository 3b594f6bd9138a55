//! Numerical building blocks
//!
//! - quadrature: adaptive Gauss-Kronrod integration
//! - roots: Brent's bracketed root finder
//! - optimize: projected L-BFGS for box-constrained minimization

pub mod quadrature;
pub mod roots;
pub mod optimize;

pub use quadrature::{integrate, QuadratureResult};
pub use roots::{brent, BRENT_MAX_ITER, BRENT_XTOL};
pub use optimize::{
    minimize_lbfgs_b, BoxConstraints, LbfgsOptions, OptimisationResult, TerminationReason,
};
