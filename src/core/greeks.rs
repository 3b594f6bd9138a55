//! Option Greeks
//!
//! Second-order sensitivities used for dealer exposure, plus the closed
//! selectors for Heston finite-difference Greeks and exposure charts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ExposureError;

/// Black-Scholes sensitivities of a single option.
///
/// Gamma, vega and volga are identical for calls and puts; vanna and charm
/// are reported in the call convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// Gamma: d²V/dS²
    pub gamma: f64,
    /// Vega: dV/dσ, per unit of volatility (1.0 = 100 vol points)
    pub vega: f64,
    /// Vanna: e^(-qT)·φ(d1)·d2/σ (sign opposite to d²V/dSdσ)
    pub vanna: f64,
    /// Volga/Vomma: d²V/dσ²
    pub volga: f64,
    /// Charm: d(delta)/dt
    pub charm: f64,
}

impl Greeks {
    /// Scale Greeks by a factor (e.g., for open interest)
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            gamma: self.gamma * factor,
            vega: self.vega * factor,
            vanna: self.vanna * factor,
            volga: self.volga * factor,
            charm: self.charm * factor,
        }
    }

    /// Add two Greeks (for aggregation)
    pub fn add(&self, other: &Greeks) -> Self {
        Self {
            gamma: self.gamma + other.gamma,
            vega: self.vega + other.vega,
            vanna: self.vanna + other.vanna,
            volga: self.volga + other.volga,
            charm: self.charm + other.charm,
        }
    }
}

/// Greeks available from the Heston finite-difference engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HestonGreek {
    /// Second difference in spot
    Gamma,
    /// Central difference in initial variance v0 (variance units, not vol)
    Vega,
    /// Mixed difference in spot and v0
    Vanna,
    /// Central difference in time to expiry
    Charm,
}

impl HestonGreek {
    pub const ALL: [HestonGreek; 4] = [
        HestonGreek::Gamma,
        HestonGreek::Vega,
        HestonGreek::Vanna,
        HestonGreek::Charm,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HestonGreek::Gamma => "gamma",
            HestonGreek::Vega => "vega",
            HestonGreek::Vanna => "vanna",
            HestonGreek::Charm => "charm",
        }
    }
}

impl fmt::Display for HestonGreek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HestonGreek {
    type Err = ExposureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gamma" => Ok(HestonGreek::Gamma),
            "vega" => Ok(HestonGreek::Vega),
            "vanna" => Ok(HestonGreek::Vanna),
            "charm" => Ok(HestonGreek::Charm),
            _ => Err(ExposureError::unsupported_greek(s)),
        }
    }
}

/// Greek selected for a dealer exposure chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExposureGreek {
    Gamma,
    Vanna,
    Volga,
    Charm,
}

impl ExposureGreek {
    pub fn name(&self) -> &'static str {
        match self {
            ExposureGreek::Gamma => "Gamma",
            ExposureGreek::Vanna => "Vanna",
            ExposureGreek::Volga => "Volga",
            ExposureGreek::Charm => "Charm",
        }
    }
}

impl fmt::Display for ExposureGreek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExposureGreek {
    type Err = ExposureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gamma" => Ok(ExposureGreek::Gamma),
            "vanna" => Ok(ExposureGreek::Vanna),
            "volga" | "vomma" => Ok(ExposureGreek::Volga),
            "charm" => Ok(ExposureGreek::Charm),
            _ => Err(ExposureError::unsupported_greek(s)),
        }
    }
}
