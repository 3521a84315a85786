//! SD-line generation by numeric inversion, with a bounded curve cache.
//!
//! A curve is a pure function of (sex, indicator, target Z, fixed age), so
//! cached entries are never invalidated; the cache only bounds memory.

use crate::config::CurveConfig;
use crate::engine::ZScoreEngine;
use crate::root_finder::{stepped_grid, RootFinder};
use crate::{Curve, Error, Indicator, ReferenceProvider, Result, Sex};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Z-scores of the conventional chart lines
pub const CANONICAL_SD_LINES: [f64; 7] = [-3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CurveKey {
    sex: Sex,
    indicator: Indicator,
    z_bits: u64,
    age_bits: Option<u64>,
}

impl CurveKey {
    fn new(sex: Sex, indicator: Indicator, target_z: f64, fixed_age: Option<f64>) -> Self {
        Self {
            sex,
            indicator,
            z_bits: canonical_bits(target_z),
            age_bits: fixed_age.map(canonical_bits),
        }
    }
}

/// Bit pattern with -0.0 folded into 0.0
fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

/// Median (Z = 0) measurements for prefilling a form
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MedianValues {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub head_circumference_cm: f64,
}

/// Produces SD lines for charting
pub struct CurveGenerator {
    engine: ZScoreEngine,
    config: CurveConfig,
    finder: RootFinder,
    age_grid: Vec<f64>,
    length_grid: Vec<f64>,
    cache: Option<Cache<CurveKey, Arc<Curve>>>,
}

impl CurveGenerator {
    pub fn new(provider: Arc<dyn ReferenceProvider>, config: CurveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(provider, config))
    }

    pub fn with_defaults(provider: Arc<dyn ReferenceProvider>) -> Self {
        Self::assemble(provider, CurveConfig::default())
    }

    fn assemble(provider: Arc<dyn ReferenceProvider>, config: CurveConfig) -> Self {
        let cache = if config.cache_capacity > 0 {
            Some(Cache::new(config.cache_capacity))
        } else {
            tracing::debug!("Curve cache disabled");
            None
        };

        Self {
            engine: ZScoreEngine::new(provider),
            finder: config.root_finder(),
            age_grid: stepped_grid(0.0, config.max_age_months, config.age_step_months),
            length_grid: stepped_grid(
                config.length_range_cm.lo,
                config.length_range_cm.hi,
                config.length_step_cm,
            ),
            config,
            cache,
        }
    }

    pub fn age_grid(&self) -> &[f64] {
        &self.age_grid
    }

    /// Curve for one SD line.
    ///
    /// Weight-for-length/height is sampled over the length grid at
    /// `fixed_age` and fails without one. Every other indicator is sampled
    /// over the age grid and ignores `fixed_age`.
    pub fn curve(
        &self,
        sex: Sex,
        indicator: Indicator,
        target_z: f64,
        fixed_age: Option<f64>,
    ) -> Result<Arc<Curve>> {
        if !target_z.is_finite() {
            return Err(Error::Curve(format!("target Z must be finite, got {}", target_z)));
        }

        let fixed_age = if indicator.is_length_based() {
            match fixed_age {
                Some(age) if age.is_finite() && age >= 0.0 => Some(age),
                Some(age) => {
                    return Err(Error::Curve(format!("invalid fixed age: {}", age)));
                }
                None => {
                    return Err(Error::Curve(format!("{} curves need a fixed age", indicator)));
                }
            }
        } else {
            None
        };

        let build = || {
            tracing::debug!(
                "Computing {} {} curve at z = {}{}",
                sex,
                indicator.key(),
                target_z,
                fixed_age.map(|a| format!(", age {}", a)).unwrap_or_default()
            );
            Arc::new(self.build(sex, indicator, target_z, fixed_age))
        };

        match &self.cache {
            Some(cache) => Ok(cache.get_with(CurveKey::new(sex, indicator, target_z, fixed_age), build)),
            None => Ok(build()),
        }
    }

    /// Domain and value sequences of [`Self::curve`], for chart callers
    pub fn generate_curve(
        &self,
        sex: Sex,
        indicator: Indicator,
        target_z: f64,
        fixed_age: Option<f64>,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let curve = self.curve(sex, indicator, target_z, fixed_age)?;
        Ok((curve.domain.clone(), curve.values.clone()))
    }

    /// The seven canonical SD lines (−3 … +3) for one indicator
    pub fn sd_lines(
        &self,
        sex: Sex,
        indicator: Indicator,
        fixed_age: Option<f64>,
    ) -> Result<Vec<Arc<Curve>>> {
        CANONICAL_SD_LINES
            .iter()
            .map(|&z| self.curve(sex, indicator, z, fixed_age))
            .collect()
    }

    /// Measurement that yields `target_z` at a single point
    pub fn invert_at(
        &self,
        sex: Sex,
        indicator: Indicator,
        age_months: f64,
        target_z: f64,
        length_cm: Option<f64>,
    ) -> f64 {
        let bounds = self.config.bounds(indicator);
        self.finder.invert(
            |v| {
                self.engine
                    .zscore(indicator, sex, age_months, v, length_cm)
                    .ok()
            },
            target_z,
            bounds.lo,
            bounds.hi,
        )
    }

    /// Median weight, height and head circumference at one age
    pub fn median_values(&self, sex: Sex, age_months: f64) -> MedianValues {
        let round = |v: f64, places: i32| {
            let f = 10f64.powi(places);
            (v * f).round() / f
        };
        MedianValues {
            weight_kg: round(self.invert_at(sex, Indicator::WeightForAge, age_months, 0.0, None), 2),
            height_cm: round(self.invert_at(sex, Indicator::HeightForAge, age_months, 0.0, None), 1),
            head_circumference_cm: round(
                self.invert_at(sex, Indicator::HeadCircumferenceForAge, age_months, 0.0, None),
                1,
            ),
        }
    }

    /// Number of curves currently held by the cache
    pub fn cached_curves(&self) -> u64 {
        match &self.cache {
            Some(cache) => {
                cache.run_pending_tasks();
                cache.entry_count()
            }
            None => 0,
        }
    }

    fn build(&self, sex: Sex, indicator: Indicator, target_z: f64, fixed_age: Option<f64>) -> Curve {
        let (domain, values) = match fixed_age {
            Some(age) => {
                let values: Vec<f64> = self
                    .length_grid
                    .iter()
                    .map(|&len| self.invert_at(sex, indicator, age, target_z, Some(len)))
                    .collect();
                (self.length_grid.clone(), values)
            }
            None => {
                let values: Vec<f64> = self
                    .age_grid
                    .iter()
                    .map(|&age| self.invert_at(sex, indicator, age, target_z, None))
                    .collect();
                (self.age_grid.clone(), values)
            }
        };

        Curve {
            indicator,
            sex,
            target_z,
            fixed_age_months: fixed_age,
            domain,
            values,
        }
    }
}
