//! Parsing helpers for caller-supplied form values.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Average days per month used by the growth standards
pub const DAYS_PER_MONTH: f64 = 30.4375;

/// Upper end of the age range the standards cover
pub const MAX_AGE_MONTHS: f64 = 60.0;

/// Age derived from two dates
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Age {
    pub months: f64,
    pub days: i64,
}

impl Age {
    pub fn from_months(months: f64) -> Self {
        Self {
            months,
            days: (months * DAYS_PER_MONTH) as i64,
        }
    }
}

/// Parse a decimal that may use a comma separator; blank means absent
pub fn parse_decimal(s: &str) -> Result<Option<f64>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    s.replace(',', ".")
        .parse::<f64>()
        .map(Some)
        .map_err(|_| Error::Input(format!("not a number: {}", s)))
}

/// Parse `YYYY-MM-DD` or `DD/MM/YYYY`
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .map_err(|_| Error::Input(format!("invalid date (YYYY-MM-DD or DD/MM/YYYY): {}", s)))
}

/// Age at `measured` for a child born on `born`
pub fn age_from_dates(born: NaiveDate, measured: NaiveDate) -> Result<Age> {
    let days = (measured - born).num_days();
    if days < 0 {
        return Err(Error::Input(format!(
            "measurement date {} is before birth date {}",
            measured, born
        )));
    }
    Ok(Age {
        months: days as f64 / DAYS_PER_MONTH,
        days,
    })
}

/// Clamp an age into the 0–60 month range
pub fn clamp_age(months: f64) -> f64 {
    months.clamp(0.0, MAX_AGE_MONTHS)
}
