//! Timestamp-aligned prediction series.

use crate::core::record::coerce_finite;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Predicted values aligned index-for-index with an actual series.
///
/// Every requested index carries a value: anything the model could not
/// produce as a finite number is stored as 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictionSeries {
    timestamps: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl PredictionSeries {
    /// Pair `values` with `timestamps`, coercing non-finite values to 0.
    pub fn new(timestamps: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::LengthMismatch {
                expected: timestamps.len(),
                got: values.len(),
            });
        }
        Ok(Self {
            timestamps,
            values: values.into_iter().map(coerce_finite).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `(timestamp, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }
}
