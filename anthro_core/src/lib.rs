#![forbid(unsafe_code)]

//! Core growth assessment logic for the Anthro system.
//!
//! This crate provides:
//! - Domain types (measurements, indicators, Z-score and classification sets)
//! - LMS growth reference lookup behind a provider trait
//! - Z-score engine with per-indicator failure isolation
//! - Nutritional status classification (WHO and national rule sets)
//! - SD-line curve generation by numeric inversion, with caching
//! - Input parsing and plausibility checks for calling layers

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod reference;
pub mod engine;
pub mod root_finder;
pub mod curves;
pub mod classify;
pub mod input;
pub mod plausibility;

// Re-export commonly used types
pub use error::{Error, ReferenceError, Result, ZScoreFailure};
pub use types::*;
pub use config::Config;
pub use reference::{LmsParams, LmsReference, ReferenceProvider};
pub use engine::{compute_all_zscores, percentile_of, ZScoreEngine, ZScoreOutcomes};
pub use root_finder::RootFinder;
pub use curves::{CurveGenerator, MedianValues, CANONICAL_SD_LINES};
pub use classify::classify;
