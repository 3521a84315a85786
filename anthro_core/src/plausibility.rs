//! Biologically implausible value checks.
//!
//! This is policy for the calling layer: the engine computes on anything it
//! is given, and these findings tell the caller what looks like a data entry
//! mistake.

use crate::{Indicator, Measurement, ZScores};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Note,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}", tag, self.message)
    }
}

/// |Z| limits as (error, warning)
fn z_limits(indicator: Indicator) -> (f64, f64) {
    match indicator {
        Indicator::WeightForAge | Indicator::HeightForAge => (6.0, 5.0),
        _ => (5.0, 4.0),
    }
}

/// Outer (error) and inner (warning) plausible range of a raw measurement
struct RawRange {
    what: &'static str,
    unit: &'static str,
    error: (f64, f64),
    warning: (f64, f64),
}

const WEIGHT: RawRange = RawRange {
    what: "weight",
    unit: "kg",
    error: (1.0, 30.0),
    warning: (2.0, 25.0),
};

const HEIGHT: RawRange = RawRange {
    what: "length/height",
    unit: "cm",
    error: (35.0, 130.0),
    warning: (40.0, 120.0),
};

const HEAD: RawRange = RawRange {
    what: "head circumference",
    unit: "cm",
    error: (20.0, 60.0),
    warning: (25.0, 55.0),
};

impl RawRange {
    fn check(&self, value: f64) -> Option<Finding> {
        if value < self.error.0 || value > self.error.1 {
            Some(Finding::new(
                Severity::Error,
                format!(
                    "{} {} {} is outside {}-{} {}; check the units",
                    self.what, value, self.unit, self.error.0, self.error.1, self.unit
                ),
            ))
        } else if value < self.warning.0 || value > self.warning.1 {
            Some(Finding::new(
                Severity::Warning,
                format!("{} {} {} is unusual; please re-check", self.what, value, self.unit),
            ))
        } else {
            None
        }
    }
}

/// All findings for one measurement and its Z-scores, most severe first
pub fn assess(m: &Measurement, z: &ZScores) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (indicator, score) in z.iter() {
        let Some(score) = score.filter(|s| !s.is_nan()) else {
            continue;
        };
        let (critical, warn) = z_limits(indicator);
        if score.abs() > critical {
            findings.push(Finding::new(
                Severity::Error,
                format!(
                    "{} = {:.2} is implausible (|Z| > {}); re-check measurement and units",
                    indicator.key().to_uppercase(),
                    score,
                    critical
                ),
            ));
        } else if score.abs() > warn {
            findings.push(Finding::new(
                Severity::Warning,
                format!(
                    "{} = {:.2} is near the extreme limit; verification recommended",
                    indicator.key().to_uppercase(),
                    score
                ),
            ));
        }
    }

    let raw = [
        (&WEIGHT, m.weight_kg),
        (&HEIGHT, m.height_cm),
        (&HEAD, m.head_circumference_cm),
    ];
    findings.extend(
        raw.iter()
            .filter_map(|(range, value)| value.and_then(|v| range.check(v))),
    );

    if m.age_months < 0.0 {
        findings.push(Finding::new(Severity::Error, "age cannot be negative"));
    } else if m.age_months > 60.0 {
        findings.push(Finding::new(
            Severity::Note,
            "the standards used here cover 0-60 months",
        ));
    }

    if let Some(h) = m.height_cm {
        if m.age_months < 24.0 && h > 100.0 {
            findings.push(Finding::new(
                Severity::Warning,
                "under 24 months but length above 100 cm; check the measuring method",
            ));
        } else if m.age_months >= 24.0 && h < 60.0 {
            findings.push(Finding::new(
                Severity::Warning,
                "24 months or older but height below 60 cm; check the measuring method",
            ));
        }
    }

    if let (Some(waz), Some(whz)) = (z.waz, z.whz) {
        if waz < -2.0 && whz > -1.0 {
            findings.push(Finding::new(
                Severity::Note,
                "low weight-for-age with normal weight-for-height suggests chronic undernutrition",
            ));
        }
    }

    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sex;

    #[test]
    fn test_clean_measurement_has_no_findings() {
        let m = Measurement::new(Sex::Male, 12.0)
            .with_weight(9.0)
            .with_height(74.0)
            .with_head_circumference(46.0);
        let z = ZScores {
            waz: Some(-0.6),
            haz: Some(-0.7),
            whz: Some(-0.2),
            baz: Some(-0.3),
            hcz: Some(0.0),
        };
        assert!(assess(&m, &z).is_empty());
    }

    #[test]
    fn test_extreme_z_is_error() {
        let m = Measurement::new(Sex::Female, 24.0).with_weight(6.0);
        let z = ZScores {
            waz: Some(-6.5),
            ..Default::default()
        };
        let findings = assess(&m, &z);
        assert_eq!(findings[0].severity, Severity::Error);
        assert!(findings[0].message.starts_with("WAZ"));
    }

    #[test]
    fn test_whz_warning_threshold() {
        let m = Measurement::new(Sex::Female, 24.0);
        let z = ZScores {
            whz: Some(4.5),
            ..Default::default()
        };
        let findings = assess(&m, &z);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_raw_ranges() {
        let m = Measurement::new(Sex::Male, 12.0)
            .with_weight(45.0)
            .with_height(38.0)
            .with_head_circumference(50.0);
        let findings = assess(&m, &ZScores::default());
        let severities: Vec<_> = findings.iter().map(|f| f.severity).collect();
        assert_eq!(severities, vec![Severity::Error, Severity::Warning]);
    }

    #[test]
    fn test_age_and_method_checks() {
        let m = Measurement::new(Sex::Male, 18.0).with_height(105.0);
        let findings = assess(&m, &ZScores::default());
        assert!(findings.iter().any(|f| f.message.contains("under 24 months")));

        let m = Measurement::new(Sex::Male, 72.0);
        let findings = assess(&m, &ZScores::default());
        assert_eq!(findings[0].severity, Severity::Note);
    }

    #[test]
    fn test_chronic_pattern_note() {
        let m = Measurement::new(Sex::Female, 30.0);
        let z = ZScores {
            waz: Some(-2.4),
            whz: Some(-0.5),
            ..Default::default()
        };
        let findings = assess(&m, &z);
        assert!(findings.iter().any(|f| f.message.contains("chronic")));
    }
}
