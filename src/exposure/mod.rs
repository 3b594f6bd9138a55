//! Dealer Exposure Aggregation
//!
//! Converts per-option Black-Scholes Greeks into dollar exposures and sums
//! them across a chain, assuming dealers are long calls and short puts.
//!
//! Two parts:
//! - **Dealer exposures**: per-strike rows for gamma, vanna, volga or charm
//! - **Gamma flip**: net gamma on a spot grid and the spot where it changes sign

mod dealer;
mod flip;

pub use dealer::*;
pub use flip::*;

use serde::{Deserialize, Serialize};

use crate::core::OptionType;

/// Shares per listed equity option contract
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Signed dealer exposure of one side of one strike
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureRow {
    pub strike: f64,
    pub side: OptionType,
    /// Positive for calls, negative for puts
    pub exposure: f64,
}
