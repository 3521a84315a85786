//! Nutritional status classification.
//!
//! Table-driven and pure. The severe band is closed at −3 (z = −3.0 is
//! severe), the moderate band runs up to but excluding −2, and every upper
//! threshold belongs to the band below it.
//!
//! | Indicator | WHO normal | National normal |
//! |-----------|------------|-----------------|
//! | WAZ       | ≤ +2       | ≤ +1            |
//! | HAZ       | ≤ +3       | ≤ +3            |
//! | WHZ       | ≤ +2       | ≤ +1            |
//! | BAZ       | ≤ +1       | ≤ +1            |
//! | HCZ       | \|z\| ≤ 2  | \|z\| ≤ 2       |

use crate::{Category, Classifications, Indicator, RuleSet, ZScores};

/// Upper bands as (inclusive upper bound, category), checked in order;
/// anything above the last bound gets the trailing category.
struct Bands {
    severe: Category,
    moderate: Category,
    upper: &'static [(f64, Category)],
    top: Category,
}

const WAZ_WHO: Bands = Bands {
    severe: Category::SeverelyUnderweight,
    moderate: Category::Underweight,
    upper: &[(2.0, Category::Normal)],
    top: Category::Overweight,
};

const WAZ_NATIONAL: Bands = Bands {
    severe: Category::SeverelyUnderweight,
    moderate: Category::Underweight,
    upper: &[(1.0, Category::Normal)],
    top: Category::RiskOfOverweight,
};

const HAZ: Bands = Bands {
    severe: Category::SeverelyStunted,
    moderate: Category::Stunted,
    upper: &[(3.0, Category::Normal)],
    top: Category::Tall,
};

const WHZ_WHO: Bands = Bands {
    severe: Category::SeverelyWasted,
    moderate: Category::Wasted,
    upper: &[(2.0, Category::Normal), (3.0, Category::RiskOfOverweight)],
    top: Category::Overweight,
};

/// Six-band wasting/overweight scale
const SIX_BAND: Bands = Bands {
    severe: Category::SeverelyWasted,
    moderate: Category::Wasted,
    upper: &[
        (1.0, Category::Normal),
        (2.0, Category::RiskOfOverweight),
        (3.0, Category::Overweight),
    ],
    top: Category::Obese,
};

const HCZ: Bands = Bands {
    severe: Category::SevereMicrocephaly,
    moderate: Category::Microcephaly,
    upper: &[(2.0, Category::Normal), (3.0, Category::Macrocephaly)],
    top: Category::SevereMacrocephaly,
};

impl Bands {
    fn classify(&self, z: Option<f64>) -> Category {
        let z = match z {
            Some(z) if !z.is_nan() => z,
            _ => return Category::DataUnavailable,
        };

        if z <= -3.0 {
            return self.severe;
        }
        if z < -2.0 {
            return self.moderate;
        }
        self.upper
            .iter()
            .find(|(bound, _)| z <= *bound)
            .map(|(_, category)| *category)
            .unwrap_or(self.top)
    }
}

fn bands(indicator: Indicator, rule_set: RuleSet) -> &'static Bands {
    match (indicator, rule_set) {
        (Indicator::WeightForAge, RuleSet::Who) => &WAZ_WHO,
        (Indicator::WeightForAge, RuleSet::National) => &WAZ_NATIONAL,
        (Indicator::HeightForAge, _) => &HAZ,
        (Indicator::WeightForHeight, RuleSet::Who) => &WHZ_WHO,
        (Indicator::WeightForHeight, RuleSet::National) => &SIX_BAND,
        (Indicator::BmiForAge, _) => &SIX_BAND,
        (Indicator::HeadCircumferenceForAge, _) => &HCZ,
    }
}

/// Category for one Z-score
pub fn classify_one(indicator: Indicator, z: Option<f64>, rule_set: RuleSet) -> Category {
    bands(indicator, rule_set).classify(z)
}

/// Categories for a full result set under one rule set
pub fn classify(z: &ZScores, rule_set: RuleSet) -> Classifications {
    Classifications {
        rule_set,
        waz: classify_one(Indicator::WeightForAge, z.waz, rule_set),
        haz: classify_one(Indicator::HeightForAge, z.haz, rule_set),
        whz: classify_one(Indicator::WeightForHeight, z.whz, rule_set),
        baz: classify_one(Indicator::BmiForAge, z.baz, rule_set),
        hcz: classify_one(Indicator::HeadCircumferenceForAge, z.hcz, rule_set),
    }
}
