//! Per-day observation records as handed over by ingestion.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A covariate cell as it arrives from ingestion.
///
/// Ingestion does not guarantee numeric columns, so a cell may carry text or
/// be absent altogether.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl RawValue {
    /// Coerce to a number.
    ///
    /// Numeric text is parsed; anything non-numeric, missing or non-finite
    /// becomes 0. This keeps every series at full length and is deliberately
    /// not an imputation scheme: data is expected to be cleaned upstream.
    pub fn to_numeric(&self) -> f64 {
        let value = match self {
            RawValue::Number(v) => *v,
            RawValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            RawValue::Missing => 0.0,
        };
        coerce_finite(value)
    }
}

/// Replace NaN and infinities with 0.
pub fn coerce_finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<Option<f64>> for RawValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(RawValue::Missing, RawValue::Number)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

/// One row per entity per day: the withdrawal target plus named covariates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub timestamp: NaiveDate,
    pub entity_id: String,
    pub target: f64,
    #[serde(default)]
    pub covariates: BTreeMap<String, RawValue>,
}

impl TimeSeriesRecord {
    pub fn new(timestamp: NaiveDate, entity_id: impl Into<String>, target: f64) -> Self {
        Self {
            timestamp,
            entity_id: entity_id.into(),
            target,
            covariates: BTreeMap::new(),
        }
    }

    pub fn with_covariate(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.covariates.insert(name.into(), value.into());
        self
    }

    /// Numeric value of a covariate; absent covariates coerce to 0.
    pub fn covariate(&self, name: &str) -> f64 {
        self.covariates
            .get(name)
            .map_or(0.0, RawValue::to_numeric)
    }

    /// Target coerced with the same fail-safe policy as covariates.
    pub fn target_value(&self) -> f64 {
        coerce_finite(self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 3, d).unwrap()
    }

    #[test]
    fn numeric_coercion_policy() {
        assert_eq!(RawValue::Number(4.5).to_numeric(), 4.5);
        assert_eq!(RawValue::Text(" 12 ".into()).to_numeric(), 12.0);
        assert_eq!(RawValue::Text("closed".into()).to_numeric(), 0.0);
        assert_eq!(RawValue::Missing.to_numeric(), 0.0);
        assert_eq!(RawValue::Number(f64::NAN).to_numeric(), 0.0);
        assert_eq!(RawValue::Text("inf".into()).to_numeric(), 0.0);
    }

    #[test]
    fn record_covariate_lookup() {
        let record = TimeSeriesRecord::new(day(1), "ATM-1", 5400.0)
            .with_covariate("HOLIDAY", 1.0)
            .with_covariate("DAY_OF_WEEK", "4")
            .with_covariate("ATM_WITHDRWLS_1WEEKAGO", None);

        assert_eq!(record.covariate("HOLIDAY"), 1.0);
        assert_eq!(record.covariate("DAY_OF_WEEK"), 4.0);
        assert_eq!(record.covariate("ATM_WITHDRWLS_1WEEKAGO"), 0.0);
        assert_eq!(record.covariate("NOT_THERE"), 0.0);
    }

    #[test]
    fn nan_target_coerces_to_zero() {
        let record = TimeSeriesRecord::new(day(2), "ATM-1", f64::NAN);
        assert_eq!(record.target_value(), 0.0);
    }

    #[test]
    fn raw_values_deserialize_untagged() {
        let parsed: BTreeMap<String, RawValue> =
            serde_json::from_str(r#"{"a": 1.5, "b": "x", "c": null}"#).unwrap();

        assert_eq!(parsed["a"], RawValue::Number(1.5));
        assert_eq!(parsed["b"], RawValue::Text("x".into()));
        assert_eq!(parsed["c"], RawValue::Missing);
    }
}
