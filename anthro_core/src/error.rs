//! Error types for the anthro_core library.

use crate::types::{Indicator, LmsTable, Sex};
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for anthro_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reference table could not be built
    #[error("Reference table error: {0}")]
    ReferenceTable(String),

    /// Curve request that cannot be served
    #[error("Curve error: {0}")]
    Curve(String),

    /// Malformed caller input (dates, numbers, sex codes)
    #[error("Invalid input: {0}")]
    Input(String),
}

/// Failure of a single reference lookup.
///
/// Providers return these instead of panicking for anything outside their
/// supported domain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReferenceError {
    #[error("{table} has no {sex} rows")]
    MissingTable { table: LmsTable, sex: Sex },

    #[error("{table} lookup at {x} is outside [{min}, {max}]")]
    OutOfRange {
        table: LmsTable,
        x: f64,
        min: f64,
        max: f64,
    },

    #[error("{0} needs a length or height")]
    MissingLength(Indicator),

    #[error("measurement must be positive, got {0}")]
    NonPositive(f64),

    #[error("{0}")]
    Other(String),
}

/// Why an indicator ended up without a Z-score.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ZScoreFailure {
    #[error("required measurement missing")]
    MissingInput,

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("non-finite result: {0}")]
    NonFinite(f64),
}
