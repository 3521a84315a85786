//! Core domain types for anthropometric assessment.
//!
//! This module defines the fundamental types used throughout the system:
//! - Sex, indicators and the reference tables behind them
//! - Subject measurements
//! - Z-score and classification result sets
//! - Reference curves

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Subject Types
// ============================================================================

/// Biological sex as used by the growth references
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Single-letter code used in reference tables
    pub fn code(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "male"),
            Sex::Female => write!(f, "female"),
        }
    }
}

impl FromStr for Sex {
    type Err = Error;

    /// Accepts English and Indonesian spellings (`m`, `boy`, `laki-laki`, ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" | "boy" | "1" | "l" | "laki-laki" | "laki" => Ok(Sex::Male),
            "f" | "female" | "girl" | "2" | "p" | "perempuan" => Ok(Sex::Female),
            other => Err(Error::Input(format!("unknown sex: {}", other))),
        }
    }
}

/// Raw measurements for one child at one visit
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub sex: Sex,
    pub age_months: f64,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub head_circumference_cm: Option<f64>,
}

impl Measurement {
    pub fn new(sex: Sex, age_months: f64) -> Self {
        Self {
            sex,
            age_months,
            weight_kg: None,
            height_cm: None,
            head_circumference_cm: None,
        }
    }

    pub fn with_weight(mut self, kg: f64) -> Self {
        self.weight_kg = Some(kg);
        self
    }

    pub fn with_height(mut self, cm: f64) -> Self {
        self.height_cm = Some(cm);
        self
    }

    pub fn with_head_circumference(mut self, cm: f64) -> Self {
        self.head_circumference_cm = Some(cm);
        self
    }

    /// Body mass index in kg/m², when both weight and a positive height exist
    pub fn bmi(&self) -> Option<f64> {
        match (self.weight_kg, self.height_cm) {
            (Some(w), Some(h)) if h > 0.0 => {
                let m = h / 100.0;
                Some(w / (m * m))
            }
            _ => None,
        }
    }
}

// ============================================================================
// Indicator Types
// ============================================================================

/// The five anthropometric indices
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    WeightForAge,
    HeightForAge,
    WeightForHeight,
    BmiForAge,
    HeadCircumferenceForAge,
}

impl Indicator {
    pub const ALL: [Indicator; 5] = [
        Indicator::WeightForAge,
        Indicator::HeightForAge,
        Indicator::WeightForHeight,
        Indicator::BmiForAge,
        Indicator::HeadCircumferenceForAge,
    ];

    /// Short Z-score key (`waz`, `haz`, ...)
    pub fn key(&self) -> &'static str {
        match self {
            Indicator::WeightForAge => "waz",
            Indicator::HeightForAge => "haz",
            Indicator::WeightForHeight => "whz",
            Indicator::BmiForAge => "baz",
            Indicator::HeadCircumferenceForAge => "hcz",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Indicator::WeightForAge => "weight-for-age",
            Indicator::HeightForAge => "length/height-for-age",
            Indicator::WeightForHeight => "weight-for-length/height",
            Indicator::BmiForAge => "BMI-for-age",
            Indicator::HeadCircumferenceForAge => "head-circumference-for-age",
        }
    }

    /// Whether the indicator's domain axis is length rather than age
    pub fn is_length_based(&self) -> bool {
        matches!(self, Indicator::WeightForHeight)
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Indicator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "waz" | "wfa" | "weight-for-age" => Ok(Indicator::WeightForAge),
            "haz" | "hfa" | "lhfa" | "height-for-age" | "length-for-age" => {
                Ok(Indicator::HeightForAge)
            }
            "whz" | "wfh" | "wfl" | "weight-for-height" | "weight-for-length" => {
                Ok(Indicator::WeightForHeight)
            }
            "baz" | "bfa" | "bmi" | "bmi-for-age" => Ok(Indicator::BmiForAge),
            "hcz" | "hcfa" | "head-circumference-for-age" => {
                Ok(Indicator::HeadCircumferenceForAge)
            }
            other => Err(Error::Input(format!("unknown indicator: {}", other))),
        }
    }
}

/// LMS reference tables, one per indicator and axis
///
/// Weight-for-length/height is split in two: the length table applies
/// below 24 months, the height table from 24 months on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LmsTable {
    Wfa,
    Lhfa,
    Wfl,
    Wfh,
    Bfa,
    Hcfa,
}

impl LmsTable {
    /// Weight-derived tables get the restricted adjustment beyond ±3 SD
    pub fn is_weight_based(&self) -> bool {
        matches!(self, LmsTable::Wfa | LmsTable::Wfl | LmsTable::Wfh | LmsTable::Bfa)
    }

    pub fn code(&self) -> &'static str {
        match self {
            LmsTable::Wfa => "wfa",
            LmsTable::Lhfa => "lhfa",
            LmsTable::Wfl => "wfl",
            LmsTable::Wfh => "wfh",
            LmsTable::Bfa => "bfa",
            LmsTable::Hcfa => "hcfa",
        }
    }
}

impl fmt::Display for LmsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LmsTable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wfa" => Ok(LmsTable::Wfa),
            "lhfa" | "hfa" => Ok(LmsTable::Lhfa),
            "wfl" => Ok(LmsTable::Wfl),
            "wfh" => Ok(LmsTable::Wfh),
            "bfa" | "bmi" => Ok(LmsTable::Bfa),
            "hcfa" => Ok(LmsTable::Hcfa),
            other => Err(Error::ReferenceTable(format!("unknown table: {}", other))),
        }
    }
}

// ============================================================================
// Result Sets
// ============================================================================

/// Z-scores for all five indicators; a missing value means "not computable"
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ZScores {
    pub waz: Option<f64>,
    pub haz: Option<f64>,
    pub whz: Option<f64>,
    pub baz: Option<f64>,
    pub hcz: Option<f64>,
}

impl ZScores {
    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        match indicator {
            Indicator::WeightForAge => self.waz,
            Indicator::HeightForAge => self.haz,
            Indicator::WeightForHeight => self.whz,
            Indicator::BmiForAge => self.baz,
            Indicator::HeadCircumferenceForAge => self.hcz,
        }
    }

    pub fn set(&mut self, indicator: Indicator, value: Option<f64>) {
        let slot = match indicator {
            Indicator::WeightForAge => &mut self.waz,
            Indicator::HeightForAge => &mut self.haz,
            Indicator::WeightForHeight => &mut self.whz,
            Indicator::BmiForAge => &mut self.baz,
            Indicator::HeadCircumferenceForAge => &mut self.hcz,
        };
        *slot = value;
    }

    /// All five entries in display order, absent ones included
    pub fn iter(&self) -> impl Iterator<Item = (Indicator, Option<f64>)> + '_ {
        Indicator::ALL.iter().map(move |&i| (i, self.get(i)))
    }
}

/// Which classification thresholds to apply
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleSet {
    /// Indonesian Ministry of Health regulation (Permenkes No. 2/2020)
    National,
    Who,
}

/// Nutritional status category
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SeverelyUnderweight,
    Underweight,
    SeverelyStunted,
    Stunted,
    SeverelyWasted,
    Wasted,
    Normal,
    RiskOfOverweight,
    Overweight,
    Obese,
    Tall,
    SevereMicrocephaly,
    Microcephaly,
    Macrocephaly,
    SevereMacrocephaly,
    DataUnavailable,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::SeverelyUnderweight => "severely underweight",
            Category::Underweight => "underweight",
            Category::SeverelyStunted => "severely stunted",
            Category::Stunted => "stunted",
            Category::SeverelyWasted => "severely wasted",
            Category::Wasted => "wasted",
            Category::Normal => "normal",
            Category::RiskOfOverweight => "risk of overweight",
            Category::Overweight => "overweight",
            Category::Obese => "obese",
            Category::Tall => "tall",
            Category::SevereMicrocephaly => "severe microcephaly",
            Category::Microcephaly => "microcephaly",
            Category::Macrocephaly => "macrocephaly",
            Category::SevereMacrocephaly => "severe macrocephaly",
            Category::DataUnavailable => "data unavailable",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One category per indicator under a single rule set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classifications {
    pub rule_set: RuleSet,
    pub waz: Category,
    pub haz: Category,
    pub whz: Category,
    pub baz: Category,
    pub hcz: Category,
}

impl Classifications {
    pub fn get(&self, indicator: Indicator) -> Category {
        match indicator {
            Indicator::WeightForAge => self.waz,
            Indicator::HeightForAge => self.haz,
            Indicator::WeightForHeight => self.whz,
            Indicator::BmiForAge => self.baz,
            Indicator::HeadCircumferenceForAge => self.hcz,
        }
    }
}

// ============================================================================
// Curve Type
// ============================================================================

/// A sampled SD line: `values[i]` yields the target Z-score at `domain[i]`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Curve {
    pub indicator: Indicator,
    pub sex: Sex,
    pub target_z: f64,
    pub fixed_age_months: Option<f64>,
    pub domain: Vec<f64>,
    pub values: Vec<f64>,
}

impl Curve {
    pub fn len(&self) -> usize {
        self.domain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domain.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.domain.iter().copied().zip(self.values.iter().copied())
    }
}
