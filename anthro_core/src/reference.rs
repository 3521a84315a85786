//! Growth reference lookups.
//!
//! The [`ReferenceProvider`] trait is the seam between the engine and the
//! statistical tables. [`LmsReference`] is the bundled implementation: it
//! loads LMS knots from CSV and interpolates between them.
//!
//! CSV layout (header required, `#` comments allowed):
//!
//! ```text
//! table,sex,x,l,m,s
//! wfa,M,0,0.3487,3.3464,0.14602
//! ```
//!
//! `x` is age in months for the age-based tables and length/height in cm for
//! `wfl`/`wfh`.

use crate::error::ReferenceError;
use crate::{Error, Indicator, LmsTable, Result, Sex};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Age at which weight-for-length gives way to weight-for-height
pub const LENGTH_TO_HEIGHT_AGE_MONTHS: f64 = 24.0;

/// Forward Z-score lookup against a growth reference.
///
/// Implementations must return an error, not panic, for inputs outside the
/// domain they cover.
pub trait ReferenceProvider: Send + Sync {
    /// Z-score of `value` for `indicator` at the given age and sex.
    ///
    /// `length_cm` is only consulted by weight-for-length/height.
    fn zscore(
        &self,
        indicator: Indicator,
        sex: Sex,
        age_months: f64,
        value: f64,
        length_cm: Option<f64>,
    ) -> std::result::Result<f64, ReferenceError>;
}

/// Box-Cox power, median and coefficient of variation at one point
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct LmsParams {
    pub l: f64,
    pub m: f64,
    pub s: f64,
}

impl LmsParams {
    pub fn new(l: f64, m: f64, s: f64) -> Self {
        Self { l, m, s }
    }

    /// Plain LMS Z-score
    pub fn zscore(&self, y: f64) -> f64 {
        if self.l.abs() < 1e-12 {
            (y / self.m).ln() / self.s
        } else {
            ((y / self.m).powf(self.l) - 1.0) / (self.l * self.s)
        }
    }

    /// Measurement at Z-score `z` (closed-form inverse of [`Self::zscore`])
    pub fn value_at(&self, z: f64) -> f64 {
        if self.l.abs() < 1e-12 {
            self.m * (self.s * z).exp()
        } else {
            self.m * (1.0 + self.l * self.s * z).powf(1.0 / self.l)
        }
    }

    /// Z-score with the WHO restricted adjustment beyond ±3 SD.
    ///
    /// Outside ±3 the distance is measured in units of the 2-to-3 SD spacing
    /// on that side, which keeps the skewed tail from compressing extreme
    /// weights.
    pub fn restricted_zscore(&self, y: f64) -> f64 {
        let z = self.zscore(y);
        if z > 3.0 {
            let sd3 = self.value_at(3.0);
            let sd23 = sd3 - self.value_at(2.0);
            3.0 + (y - sd3) / sd23
        } else if z < -3.0 {
            let sd3 = self.value_at(-3.0);
            let sd23 = self.value_at(-2.0) - sd3;
            -3.0 + (y - sd3) / sd23
        } else {
            z
        }
    }

    fn lerp(&self, other: &LmsParams, t: f64) -> LmsParams {
        LmsParams {
            l: self.l + (other.l - self.l) * t,
            m: self.m + (other.m - self.m) * t,
            s: self.s + (other.s - self.s) * t,
        }
    }
}

/// One knot of an LMS table
#[derive(Clone, Copy, Debug, PartialEq)]
struct Knot {
    x: f64,
    params: LmsParams,
}

/// Raw CSV row
#[derive(Debug, Deserialize)]
struct LmsRow {
    table: String,
    sex: String,
    x: f64,
    l: f64,
    m: f64,
    s: f64,
}

/// LMS tables keyed by (table, sex), knots sorted by `x`
#[derive(Clone, Debug, Default)]
pub struct LmsReference {
    tables: HashMap<(LmsTable, Sex), Vec<Knot>>,
}

impl LmsReference {
    /// Build from already-parsed knots
    pub fn from_knots<I>(knots: I) -> Result<Self>
    where
        I: IntoIterator<Item = (LmsTable, Sex, f64, LmsParams)>,
    {
        let mut reference = Self::default();
        for (table, sex, x, params) in knots {
            reference
                .insert(table, sex, x, params)
                .map_err(Error::ReferenceTable)?;
        }
        reference.finish();
        Ok(reference)
    }

    /// Load an LMS CSV from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reference = Self::from_reader(file)?;
        tracing::info!(
            "Loaded {} LMS tables ({} knots) from {:?}",
            reference.tables.len(),
            reference.knot_count(),
            path
        );
        Ok(reference)
    }

    /// Load an LMS CSV from any reader
    ///
    /// Row errors name the physical line, counting comment lines.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(data.as_slice());

        let headers = rdr.headers()?.clone();
        let mut record = csv::StringRecord::new();
        let mut reference = Self::default();
        while rdr.read_record(&mut record)? {
            let end = rdr.position().byte() as usize;
            let bad_row = |msg: String| {
                Error::ReferenceTable(format!("line {}: {}", line_ending_at(&data, end), msg))
            };

            let row: LmsRow = record
                .deserialize(Some(&headers))
                .map_err(|e| bad_row(e.to_string()))?;
            let table: LmsTable = row.table.parse().map_err(|e| bad_row(detail(e)))?;
            let sex: Sex = row.sex.parse().map_err(|e| bad_row(detail(e)))?;
            reference
                .insert(table, sex, row.x, LmsParams::new(row.l, row.m, row.s))
                .map_err(bad_row)?;
        }

        if reference.tables.is_empty() {
            return Err(Error::ReferenceTable("no LMS rows found".into()));
        }

        reference.finish();
        Ok(reference)
    }

    fn insert(
        &mut self,
        table: LmsTable,
        sex: Sex,
        x: f64,
        params: LmsParams,
    ) -> std::result::Result<(), String> {
        let valid = x.is_finite()
            && params.l.is_finite()
            && params.m.is_finite()
            && params.m > 0.0
            && params.s.is_finite()
            && params.s > 0.0;
        if !valid {
            return Err(format!(
                "invalid knot {} {} at {}: {:?}",
                table,
                sex.code(),
                x,
                params
            ));
        }
        self.tables
            .entry((table, sex))
            .or_default()
            .push(Knot { x, params });
        Ok(())
    }

    /// Sort knots and drop duplicate positions (last one wins)
    fn finish(&mut self) {
        for ((table, sex), knots) in self.tables.iter_mut() {
            knots.sort_by(|a, b| a.x.total_cmp(&b.x));
            let before = knots.len();
            let mut deduped: Vec<Knot> = Vec::with_capacity(before);
            for knot in knots.drain(..) {
                match deduped.last_mut() {
                    Some(last) if last.x == knot.x => *last = knot,
                    _ => deduped.push(knot),
                }
            }
            if deduped.len() != before {
                tracing::warn!(
                    "{} {}: {} duplicate knots replaced",
                    table,
                    sex.code(),
                    before - deduped.len()
                );
            }
            *knots = deduped;
        }
    }

    pub fn knot_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn has_table(&self, table: LmsTable, sex: Sex) -> bool {
        self.tables.contains_key(&(table, sex))
    }

    /// Interpolated LMS parameters at `x`
    pub fn params(
        &self,
        table: LmsTable,
        sex: Sex,
        x: f64,
    ) -> std::result::Result<LmsParams, ReferenceError> {
        let knots = self
            .tables
            .get(&(table, sex))
            .filter(|k| !k.is_empty())
            .ok_or(ReferenceError::MissingTable { table, sex })?;

        let (first, last) = (knots[0], knots[knots.len() - 1]);
        if !x.is_finite() || x < first.x - 1e-9 || x > last.x + 1e-9 {
            return Err(ReferenceError::OutOfRange {
                table,
                x,
                min: first.x,
                max: last.x,
            });
        }

        let idx = knots.partition_point(|k| k.x < x);
        if idx == 0 {
            return Ok(first.params);
        }
        if idx >= knots.len() {
            return Ok(last.params);
        }

        let (lo, hi) = (knots[idx - 1], knots[idx]);
        if (hi.x - x).abs() < 1e-9 {
            return Ok(hi.params);
        }
        let t = (x - lo.x) / (hi.x - lo.x);
        Ok(lo.params.lerp(&hi.params, t))
    }

    /// Table and axis position used for an indicator lookup
    pub fn resolve(
        indicator: Indicator,
        age_months: f64,
        length_cm: Option<f64>,
    ) -> std::result::Result<(LmsTable, f64), ReferenceError> {
        match indicator {
            Indicator::WeightForAge => Ok((LmsTable::Wfa, age_months)),
            Indicator::HeightForAge => Ok((LmsTable::Lhfa, age_months)),
            Indicator::BmiForAge => Ok((LmsTable::Bfa, age_months)),
            Indicator::HeadCircumferenceForAge => Ok((LmsTable::Hcfa, age_months)),
            Indicator::WeightForHeight => {
                let length = length_cm.ok_or(ReferenceError::MissingLength(indicator))?;
                let table = if age_months < LENGTH_TO_HEIGHT_AGE_MONTHS {
                    LmsTable::Wfl
                } else {
                    LmsTable::Wfh
                };
                Ok((table, length))
            }
        }
    }
}

/// 1-based line of the last record that ends at byte `end`
fn line_ending_at(data: &[u8], end: usize) -> usize {
    let mut end = end.min(data.len());
    while end > 0 && matches!(data[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    1 + data[..end].iter().filter(|&&b| b == b'\n').count()
}

/// Message of a parse error without its variant prefix
fn detail(e: Error) -> String {
    match e {
        Error::Input(msg) | Error::ReferenceTable(msg) => msg,
        other => other.to_string(),
    }
}

impl ReferenceProvider for LmsReference {
    fn zscore(
        &self,
        indicator: Indicator,
        sex: Sex,
        age_months: f64,
        value: f64,
        length_cm: Option<f64>,
    ) -> std::result::Result<f64, ReferenceError> {
        if !(value > 0.0) {
            return Err(ReferenceError::NonPositive(value));
        }
        let (table, x) = Self::resolve(indicator, age_months, length_cm)?;
        let params = self.params(table, sex, x)?;
        if table.is_weight_based() {
            Ok(params.restricted_zscore(value))
        } else {
            Ok(params.zscore(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> LmsReference {
        LmsReference::from_knots(vec![
            (LmsTable::Wfa, Sex::Male, 0.0, LmsParams::new(0.3487, 3.3464, 0.14602)),
            (LmsTable::Wfa, Sex::Male, 12.0, LmsParams::new(0.0644, 9.6479, 0.10925)),
            (LmsTable::Lhfa, Sex::Male, 0.0, LmsParams::new(1.0, 49.8842, 0.03795)),
            (LmsTable::Lhfa, Sex::Male, 12.0, LmsParams::new(1.0, 75.7488, 0.03137)),
            (LmsTable::Wfl, Sex::Male, 45.0, LmsParams::new(-0.3521, 2.441, 0.09182)),
            (LmsTable::Wfl, Sex::Male, 110.0, LmsParams::new(-0.3521, 18.3, 0.0835)),
        ])
        .unwrap()
    }

    #[test]
    fn test_median_is_zero() {
        let reference = sample();
        let z = reference
            .zscore(Indicator::WeightForAge, Sex::Male, 12.0, 9.6479, None)
            .unwrap();
        assert_relative_eq!(z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_value_at_inverts_zscore() {
        let p = LmsParams::new(-0.3521, 9.2, 0.08);
        for z in [-2.5, -1.0, 0.0, 1.5, 2.9] {
            assert_relative_eq!(p.zscore(p.value_at(z)), z, epsilon = 1e-9);
        }

        let log_normal = LmsParams::new(0.0, 10.0, 0.1);
        assert_relative_eq!(log_normal.zscore(log_normal.value_at(1.2)), 1.2, epsilon = 1e-9);
    }

    #[test]
    fn test_restricted_adjustment_beyond_three() {
        let p = LmsParams::new(0.0644, 9.6479, 0.10925);
        let sd3 = p.value_at(3.0);
        let sd2 = p.value_at(2.0);
        let y = sd3 + (sd3 - sd2);
        assert_relative_eq!(p.restricted_zscore(y), 4.0, epsilon = 1e-9);

        // Inside ±3 nothing changes
        assert_relative_eq!(p.restricted_zscore(9.0), p.zscore(9.0), epsilon = 1e-12);
    }

    #[test]
    fn test_interpolates_between_knots() {
        let reference = sample();
        let p = reference.params(LmsTable::Lhfa, Sex::Male, 6.0).unwrap();
        assert_relative_eq!(p.m, (49.8842 + 75.7488) / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_out_of_range_is_error() {
        let reference = sample();
        let err = reference
            .zscore(Indicator::WeightForAge, Sex::Male, 13.0, 9.0, None)
            .unwrap_err();
        assert!(matches!(err, ReferenceError::OutOfRange { .. }));
    }

    #[test]
    fn test_missing_sex_is_error() {
        let reference = sample();
        let err = reference
            .zscore(Indicator::WeightForAge, Sex::Female, 6.0, 7.0, None)
            .unwrap_err();
        assert_eq!(
            err,
            ReferenceError::MissingTable {
                table: LmsTable::Wfa,
                sex: Sex::Female
            }
        );
    }

    #[test]
    fn test_weight_for_length_table_choice() {
        assert_eq!(
            LmsReference::resolve(Indicator::WeightForHeight, 23.9, Some(80.0)).unwrap(),
            (LmsTable::Wfl, 80.0)
        );
        assert_eq!(
            LmsReference::resolve(Indicator::WeightForHeight, 24.0, Some(80.0)).unwrap(),
            (LmsTable::Wfh, 80.0)
        );
        assert_eq!(
            LmsReference::resolve(Indicator::WeightForHeight, 12.0, None).unwrap_err(),
            ReferenceError::MissingLength(Indicator::WeightForHeight)
        );
    }

    #[test]
    fn test_non_positive_measurement() {
        let reference = sample();
        assert_eq!(
            reference
                .zscore(Indicator::WeightForAge, Sex::Male, 6.0, 0.0, None)
                .unwrap_err(),
            ReferenceError::NonPositive(0.0)
        );
    }

    #[test]
    fn test_load_csv() {
        let csv = "\
# sample
table,sex,x,l,m,s
wfa,M,0,0.3487,3.3464,0.14602
wfa,M,12,0.0644,9.6479,0.10925
hcfa, F ,0,1,33.8787,0.03496
";
        let reference = LmsReference::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(reference.knot_count(), 3);
        assert!(reference.has_table(LmsTable::Hcfa, Sex::Female));
        assert!(!reference.has_table(LmsTable::Hcfa, Sex::Male));
    }

    #[test]
    fn test_load_csv_rejects_bad_rows() {
        let bad_table = "table,sex,x,l,m,s\narm,M,0,1,10,0.1\n";
        assert!(matches!(
            LmsReference::from_reader(bad_table.as_bytes()),
            Err(Error::ReferenceTable(_))
        ));

        let bad_sigma = "table,sex,x,l,m,s\nwfa,M,0,1,10,0\n";
        assert!(matches!(
            LmsReference::from_reader(bad_sigma.as_bytes()),
            Err(Error::ReferenceTable(_))
        ));

        let empty = "table,sex,x,l,m,s\n";
        assert!(LmsReference::from_reader(empty.as_bytes()).is_err());
    }

    #[test]
    fn test_bad_row_reports_physical_line() {
        let csv = "\
# WHO child growth standards
# excerpt
# boys
table,sex,x,l,m,s
wfa,M,0,0.3487,3.3464,0.14602
# one month
wfa,M,1,0.2297,4.4709,0
";
        let err = LmsReference::from_reader(csv.as_bytes()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Reference table error: line 7: invalid knot"), "{}", msg);
        assert_eq!(msg.matches("Reference table error").count(), 1);
        assert!(msg.contains("wfa M at 1"), "{}", msg);

        let csv = "table,sex,x,l,m,s\n# note\nwfa,M,0,1,10,0.1\nhfa,X,0,1,50,0.03\n";
        let msg = LmsReference::from_reader(csv.as_bytes()).unwrap_err().to_string();
        assert_eq!(msg, "Reference table error: line 4: unknown sex: x");
    }

    #[test]
    fn test_duplicate_knots_last_wins() {
        let reference = LmsReference::from_knots(vec![
            (LmsTable::Hcfa, Sex::Male, 0.0, LmsParams::new(1.0, 34.0, 0.03)),
            (LmsTable::Hcfa, Sex::Male, 0.0, LmsParams::new(1.0, 35.0, 0.03)),
        ])
        .unwrap();
        assert_eq!(reference.knot_count(), 1);
        assert_relative_eq!(
            reference.params(LmsTable::Hcfa, Sex::Male, 0.0).unwrap().m,
            35.0
        );
    }
}
