//! Z-score engine.
//!
//! Wraps a [`ReferenceProvider`] so that every indicator is computed
//! independently: a missing measurement, a provider error or a non-finite
//! result only blanks that one indicator.

use crate::error::ZScoreFailure;
use crate::{Indicator, Measurement, ReferenceProvider, ZScores};
use std::sync::Arc;

/// Per-indicator outcome, keeping the reason for every missing score
#[derive(Clone, Debug, PartialEq)]
pub struct ZScoreOutcomes {
    pub waz: Result<f64, ZScoreFailure>,
    pub haz: Result<f64, ZScoreFailure>,
    pub whz: Result<f64, ZScoreFailure>,
    pub baz: Result<f64, ZScoreFailure>,
    pub hcz: Result<f64, ZScoreFailure>,
}

impl ZScoreOutcomes {
    pub fn get(&self, indicator: Indicator) -> &Result<f64, ZScoreFailure> {
        match indicator {
            Indicator::WeightForAge => &self.waz,
            Indicator::HeightForAge => &self.haz,
            Indicator::WeightForHeight => &self.whz,
            Indicator::BmiForAge => &self.baz,
            Indicator::HeadCircumferenceForAge => &self.hcz,
        }
    }

    /// Collapse to the public contract: failures become `None`
    pub fn scores(&self) -> ZScores {
        let mut scores = ZScores::default();
        for indicator in Indicator::ALL {
            scores.set(indicator, self.get(indicator).as_ref().ok().copied());
        }
        scores
    }
}

/// Computes the five indices for one subject
#[derive(Clone)]
pub struct ZScoreEngine {
    provider: Arc<dyn ReferenceProvider>,
}

impl ZScoreEngine {
    pub fn new(provider: Arc<dyn ReferenceProvider>) -> Self {
        Self { provider }
    }

    /// Z-scores for every indicator; never fails
    pub fn compute(&self, measurement: &Measurement) -> ZScores {
        self.compute_detailed(measurement).scores()
    }

    /// Like [`Self::compute`] but keeps why each missing score is missing
    pub fn compute_detailed(&self, m: &Measurement) -> ZScoreOutcomes {
        let outcomes = ZScoreOutcomes {
            waz: self.single(Indicator::WeightForAge, m, m.weight_kg, None),
            haz: self.single(Indicator::HeightForAge, m, m.height_cm, None),
            whz: match m.height_cm {
                Some(h) => self.single(Indicator::WeightForHeight, m, m.weight_kg, Some(h)),
                None => Err(ZScoreFailure::MissingInput),
            },
            baz: match (m.weight_kg, m.height_cm) {
                (Some(_), Some(_)) => self.single(Indicator::BmiForAge, m, m.bmi(), None),
                _ => Err(ZScoreFailure::MissingInput),
            },
            hcz: self.single(
                Indicator::HeadCircumferenceForAge,
                m,
                m.head_circumference_cm,
                None,
            ),
        };

        for indicator in Indicator::ALL {
            match outcomes.get(indicator) {
                Err(ZScoreFailure::MissingInput) | Ok(_) => {}
                Err(e) => tracing::debug!(
                    "{} unavailable for {} at {:.2} months: {}",
                    indicator.key(),
                    m.sex,
                    m.age_months,
                    e
                ),
            }
        }

        outcomes
    }

    /// Forward Z-score for a single value, filtered for finiteness.
    ///
    /// This is the function the curve generator inverts.
    pub fn zscore(
        &self,
        indicator: Indicator,
        sex: crate::Sex,
        age_months: f64,
        value: f64,
        length_cm: Option<f64>,
    ) -> Result<f64, ZScoreFailure> {
        let z = self
            .provider
            .zscore(indicator, sex, age_months, value, length_cm)?;
        if z.is_finite() {
            Ok(z)
        } else {
            Err(ZScoreFailure::NonFinite(z))
        }
    }

    fn single(
        &self,
        indicator: Indicator,
        m: &Measurement,
        value: Option<f64>,
        length_cm: Option<f64>,
    ) -> Result<f64, ZScoreFailure> {
        let value = value.ok_or(ZScoreFailure::MissingInput)?;
        self.zscore(indicator, m.sex, m.age_months, value, length_cm)
    }
}

/// Convenience wrapper matching the exposed `compute_all_zscores` contract
pub fn compute_all_zscores(provider: &Arc<dyn ReferenceProvider>, m: &Measurement) -> ZScores {
    ZScoreEngine::new(Arc::clone(provider)).compute(m)
}

/// Percentile of a Z-score under the standard normal, one decimal
pub fn percentile_of(z: Option<f64>) -> Option<f64> {
    let z = z.filter(|z| !z.is_nan())?;
    let p = 0.5 * (1.0 + libm::erf(z / std::f64::consts::SQRT_2)) * 100.0;
    Some((p * 10.0).round() / 10.0)
}
