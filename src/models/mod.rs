//! Pricing Models
//!
//! Implements:
//! - Black-Scholes (closed-form Greeks, pricing, IV inversion)
//! - Heston Stochastic Volatility (characteristic-function pricer, FD Greeks)
//! - Heston Monte Carlo paths and the Heston-implied smile

pub mod black_scholes;
pub mod heston;
pub mod simulation;

pub use black_scholes::{implied_volatility, norm_cdf, norm_pdf, probability_itm};
pub use heston::*;
pub use simulation::*;
