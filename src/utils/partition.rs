//! Calendar train/test partitioning.
//!
//! Splits are purely temporal: no shuffling, no sampling. Everything strictly
//! before the boundary trains the model, everything on or after it is held out.

use crate::core::EntitySeries;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;

/// Train and test windows of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: EntitySeries,
    pub test: EntitySeries,
    pub boundary: NaiveDate,
}

impl TrainTestSplit {
    pub fn has_empty_test(&self) -> bool {
        self.test.is_empty()
    }
}

/// Splits entity series at a fixed calendar boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesPartitioner {
    boundary: NaiveDate,
}

impl SeriesPartitioner {
    pub fn new(boundary: NaiveDate) -> Self {
        Self { boundary }
    }

    pub fn boundary(&self) -> NaiveDate {
        self.boundary
    }

    /// Split into `train = {t < boundary}` and `test = {t >= boundary}`.
    ///
    /// Both halves are contiguous slices of the input and share its schema.
    pub fn split(&self, series: &EntitySeries) -> TrainTestSplit {
        let cut = series
            .records()
            .partition_point(|r| r.timestamp < self.boundary);
        TrainTestSplit {
            train: series.range(0, cut),
            test: series.range(cut, series.len()),
            boundary: self.boundary,
        }
    }

    /// Like [`SeriesPartitioner::split`], but an empty test window is an
    /// [`ForecastError::EmptyTestWindow`] since no accuracy can be measured on it.
    pub fn split_for_evaluation(&self, series: &EntitySeries) -> Result<TrainTestSplit> {
        let split = self.split(series);
        if split.has_empty_test() {
            return Err(ForecastError::EmptyTestWindow {
                entity_id: series.entity_id().to_string(),
            });
        }
        Ok(split)
    }
}
