//! Core data types for the exposure and Heston analytics core
//!
//! Defines fundamental types:
//! - OptionType / MarketInputs: Black-Scholes inputs for one option
//! - OptionChain: per-strike call/put IV and open interest
//! - Greeks: second-order sensitivities and Greek selectors
//! - ExposureError: crate error type

pub mod option;
pub mod chain;
pub mod greeks;
pub mod error;

pub use option::*;
pub use chain::*;
pub use greeks::*;
pub use error::*;
