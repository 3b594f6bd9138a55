//! # Options Exposure - Dealer Greeks and Heston Analytics
//!
//! The quantitative core behind an option-chain dashboard: dealer exposure
//! metrics (gamma, vanna, volga, charm), the gamma flip, and Heston model
//! pricing, calibration and simulation.
//!
//! ## Key Components
//!
//! - **Black-Scholes**: closed-form second-order Greeks and IV inversion
//! - **Exposure**: per-strike dealer exposures and the zero-gamma search
//! - **Heston**: characteristic-function pricer with finite-difference Greeks
//! - **Calibration**: bounded least-squares fit with a Feller penalty
//! - **Simulation**: Euler-Maruyama paths and the Heston-implied smile
//!
//! ## Usage
//!
//! ```rust,no_run
//! use options_exposure::prelude::*;
//!
//! let chain = OptionChain::from_rows(vec![
//!     OptionChainRow::new(95.0, SideQuote::new(1200.0, 0.24), SideQuote::new(3400.0, 0.27)),
//!     OptionChainRow::new(100.0, SideQuote::new(2500.0, 0.21), SideQuote::new(2100.0, 0.22)),
//!     OptionChainRow::new(105.0, SideQuote::new(4100.0, 0.19), SideQuote::new(900.0, 0.21)),
//! ])
//! .unwrap();
//!
//! let config = EngineConfig::default();
//! let rows = chain_exposures(&chain, 100.0, 0.1, 0.05, 0.015, ExposureGreek::Gamma);
//! let summary = ExposureSummary::from_rows(ExposureGreek::Gamma, &rows);
//! let flip = find_zero_gamma_around(&chain, 100.0, 0.1, &config.exposure);
//!
//! let pricer = HestonPricer::new(config.pricer);
//! let price = pricer
//!     .call_price(100.0, 100.0, 0.25, 0.05, 0.0, &HestonParams::typical_equity())
//!     .unwrap();
//! ```
//!
//! ## What This Crate Does NOT Do
//!
//! - Fetch market data or authenticate with a broker
//! - Render charts or persist results
//! - Price American exercise (everything is European)

pub mod calibration;
pub mod config;
pub mod core;
pub mod exposure;
pub mod math;
pub mod models;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        parse_expiration_key, time_to_expiry, ExposureError, ExposureGreek, ExposureResult,
        Greeks, HestonGreek, MarketInputs, OptionChain, OptionChainRow, OptionType, SideQuote,
    };

    // Configuration
    pub use crate::config::{
        CalibrationConfig, CharacteristicFormulation, EngineConfig, ExposureConfig,
        PricerConfig, QuadratureConfig, SimulationConfig,
    };

    // Models
    pub use crate::models::{
        black_scholes, implied_volatility, implied_volatility_smile, probability_itm,
        simulate_heston_paths, HestonParams, HestonPaths, HestonPricer, SimulatedPath,
        DEFAULT_GREEK_BUMP,
    };

    // Exposure
    pub use crate::exposure::{
        chain_exposures, find_zero_gamma, find_zero_gamma_around, gamma_profile, net_greeks,
        total_gamma_at_spot, ExposureRow, ExposureSummary, GammaProfile,
    };

    // Calibration
    pub use crate::calibration::{
        calibrate_heston, CalibrationResult, CalibrationTarget, FELLER_PENALTY,
    };
}

// Re-export main types at crate root
pub use crate::core::{ExposureError, ExposureResult};
pub use crate::models::{HestonParams, HestonPricer};
