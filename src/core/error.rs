//! Error types for the exposure and Heston analytics core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExposureError {
    #[error("Pricing error: {0}")]
    Pricing(String),

    #[error("Calibration error: {0}")]
    Calibration(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported Greek: {0} (choose gamma, vega, vanna, charm)")]
    UnsupportedGreek(String),

    #[error("Insufficient data: need at least {required} valid points, found {found}")]
    InsufficientData { required: usize, found: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type ExposureResult<T> = Result<T, ExposureError>;

impl ExposureError {
    pub fn pricing(msg: impl Into<String>) -> Self {
        Self::Pricing(msg.into())
    }

    pub fn calibration(msg: impl Into<String>) -> Self {
        Self::Calibration(msg.into())
    }

    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::Numerical(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unsupported_greek(name: impl Into<String>) -> Self {
        Self::UnsupportedGreek(name.into())
    }
}

impl From<serde_json::Error> for ExposureError {
    fn from(e: serde_json::Error) -> Self {
        ExposureError::Serialization(e.to_string())
    }
}
