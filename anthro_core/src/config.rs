//! Configuration file support for Anthro.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/anthro/config.toml`.

use crate::root_finder::RootFinder;
use crate::{Error, Indicator, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub reference: ReferenceConfig,

    #[serde(default)]
    pub curves: CurveConfig,
}

/// Growth reference source
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ReferenceConfig {
    /// LMS table in CSV form
    #[serde(default)]
    pub lms_path: Option<PathBuf>,
}

/// Measurement search interval for inverting one indicator
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub lo: f64,
    pub hi: f64,
}

impl Bounds {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }
}

/// Curve generation and caching parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CurveConfig {
    /// Maximum cached curves; 0 disables the cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    #[serde(default = "default_grid_samples")]
    pub grid_samples: usize,

    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_max_age_months")]
    pub max_age_months: f64,

    #[serde(default = "default_age_step_months")]
    pub age_step_months: f64,

    #[serde(default = "default_length_range_cm")]
    pub length_range_cm: Bounds,

    #[serde(default = "default_length_step_cm")]
    pub length_step_cm: f64,

    #[serde(default = "default_weight_bounds")]
    pub weight_kg: Bounds,

    #[serde(default = "default_height_bounds")]
    pub height_cm: Bounds,

    #[serde(default = "default_head_circumference_bounds")]
    pub head_circumference_cm: Bounds,

    #[serde(default = "default_bmi_bounds")]
    pub bmi: Bounds,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            grid_samples: default_grid_samples(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            max_age_months: default_max_age_months(),
            age_step_months: default_age_step_months(),
            length_range_cm: default_length_range_cm(),
            length_step_cm: default_length_step_cm(),
            weight_kg: default_weight_bounds(),
            height_cm: default_height_bounds(),
            head_circumference_cm: default_head_circumference_bounds(),
            bmi: default_bmi_bounds(),
        }
    }
}

impl CurveConfig {
    /// Search interval for the measurement behind an indicator
    pub fn bounds(&self, indicator: Indicator) -> Bounds {
        match indicator {
            Indicator::WeightForAge | Indicator::WeightForHeight => self.weight_kg,
            Indicator::HeightForAge => self.height_cm,
            Indicator::HeadCircumferenceForAge => self.head_circumference_cm,
            Indicator::BmiForAge => self.bmi,
        }
    }

    pub fn root_finder(&self) -> RootFinder {
        RootFinder {
            grid_samples: self.grid_samples,
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_samples < 2 {
            return Err(Error::Config("curves.grid_samples must be at least 2".into()));
        }
        if !(self.tolerance > 0.0) {
            return Err(Error::Config("curves.tolerance must be positive".into()));
        }
        if !(self.age_step_months > 0.0) || !(self.length_step_cm > 0.0) {
            return Err(Error::Config("curve grid steps must be positive".into()));
        }
        let ranges = [
            ("length_range_cm", self.length_range_cm),
            ("weight_kg", self.weight_kg),
            ("height_cm", self.height_cm),
            ("head_circumference_cm", self.head_circumference_cm),
            ("bmi", self.bmi),
        ];
        for (name, b) in ranges {
            if !(b.lo < b.hi) {
                return Err(Error::Config(format!(
                    "curves.{}: lo ({}) must be below hi ({})",
                    name, b.lo, b.hi
                )));
            }
        }
        Ok(())
    }
}

// Default value functions
fn default_cache_capacity() -> u64 {
    1024
}

fn default_grid_samples() -> usize {
    120
}

fn default_tolerance() -> f64 {
    1e-5
}

fn default_max_iterations() -> u32 {
    100
}

fn default_max_age_months() -> f64 {
    60.0
}

fn default_age_step_months() -> f64 {
    0.25
}

fn default_length_range_cm() -> Bounds {
    Bounds::new(45.0, 110.0)
}

fn default_length_step_cm() -> f64 {
    0.5
}

fn default_weight_bounds() -> Bounds {
    Bounds::new(1.0, 30.0)
}

fn default_height_bounds() -> Bounds {
    Bounds::new(45.0, 125.0)
}

fn default_head_circumference_bounds() -> Bounds {
    Bounds::new(30.0, 55.0)
}

fn default_bmi_bounds() -> Bounds {
    Bounds::new(9.0, 25.0)
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.curves.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("anthro").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.reference.lms_path.is_none());
        assert_eq!(config.curves.cache_capacity, 1024);
        assert_eq!(config.curves.grid_samples, 120);
        assert_eq!(config.curves.bounds(Indicator::HeightForAge), Bounds::new(45.0, 125.0));
        assert!(config.curves.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.reference.lms_path = Some(PathBuf::from("/tmp/who_lms.csv"));
        config.curves.cache_capacity = 64;
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.reference.lms_path, config.reference.lms_path);
        assert_eq!(parsed.curves, config.curves);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[curves]
cache_capacity = 0
weight_kg = { lo = 0.5, hi = 35.0 }
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.curves.cache_capacity, 0);
        assert_eq!(config.curves.weight_kg, Bounds::new(0.5, 35.0));
        assert_eq!(config.curves.grid_samples, 120); // default
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[curves]\nheight_cm = { lo = 120.0, hi = 45.0 }\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
