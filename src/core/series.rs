//! One entity's validated, chronologically ordered series.

use crate::core::exog::ExogMatrix;
use crate::core::record::TimeSeriesRecord;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Outcome of matching a feature set's covariates against a record schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CovariateSelection {
    /// Covariates present in the schema, in feature-set order.
    pub selected: Vec<String>,
    /// Covariates the feature set names but the schema lacks.
    pub dropped: Vec<String>,
}

impl CovariateSelection {
    pub fn is_degraded(&self) -> bool {
        !self.dropped.is_empty()
    }
}

/// The series of a single entity with its record schema.
///
/// The schema is the set of covariate names observed in any of the entity's
/// records; a record lacking a schema column contributes 0 for it.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySeries {
    entity_id: String,
    records: Vec<TimeSeriesRecord>,
    schema: BTreeSet<String>,
}

impl EntitySeries {
    /// Validate and wrap an entity's records.
    ///
    /// Every record must belong to `entity_id` and timestamps must be
    /// strictly increasing.
    pub fn new(entity_id: impl Into<String>, records: Vec<TimeSeriesRecord>) -> Result<Self> {
        let entity_id = entity_id.into();

        if let Some(foreign) = records.iter().find(|r| r.entity_id != entity_id) {
            return Err(ForecastError::InvalidParameter(format!(
                "record for entity '{}' found in series of '{}'",
                foreign.entity_id, entity_id
            )));
        }
        for pair in records.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(ForecastError::TimestampError(format!(
                    "timestamps must be strictly increasing for entity '{}' ({} after {})",
                    entity_id, pair[1].timestamp, pair[0].timestamp
                )));
            }
        }

        let schema = records
            .iter()
            .flat_map(|r| r.covariates.keys().cloned())
            .collect();

        Ok(Self {
            entity_id,
            records,
            schema,
        })
    }

    /// Group loose records by entity, sorting each entity chronologically.
    ///
    /// Entities are returned in order of first appearance. Duplicate dates
    /// within an entity are rejected.
    pub fn group(records: Vec<TimeSeriesRecord>) -> Result<Vec<EntitySeries>> {
        Self::group_each(records)
            .into_iter()
            .map(|(_, series)| series)
            .collect()
    }

    /// Like [`EntitySeries::group`], but validates each entity on its own so
    /// one entity's bad data does not hide the others.
    pub fn group_each(records: Vec<TimeSeriesRecord>) -> Vec<(String, Result<EntitySeries>)> {
        let mut order: Vec<String> = Vec::new();
        let mut buckets: Vec<Vec<TimeSeriesRecord>> = Vec::new();
        for record in records {
            match order.iter().position(|id| *id == record.entity_id) {
                Some(i) => buckets[i].push(record),
                None => {
                    order.push(record.entity_id.clone());
                    buckets.push(vec![record]);
                }
            }
        }

        order
            .into_iter()
            .zip(buckets)
            .map(|(id, mut recs)| {
                recs.sort_by_key(|r| r.timestamp);
                let series = EntitySeries::new(id.clone(), recs);
                (id, series)
            })
            .collect()
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn records(&self) -> &[TimeSeriesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn schema(&self) -> &BTreeSet<String> {
        &self.schema
    }

    pub fn has_covariate(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    pub fn timestamps(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.timestamp).collect()
    }

    /// Target values with non-finite entries coerced to 0.
    pub fn target_values(&self) -> Vec<f64> {
        self.records.iter().map(TimeSeriesRecord::target_value).collect()
    }

    /// Split a feature set's covariates into those this schema has and those it lacks.
    pub fn select_covariates<S: AsRef<str>>(&self, names: &[S]) -> CovariateSelection {
        let mut selection = CovariateSelection::default();
        for name in names {
            let name = name.as_ref();
            if self.has_covariate(name) {
                if !selection.selected.iter().any(|s| s == name) {
                    selection.selected.push(name.to_string());
                }
            } else {
                selection.dropped.push(name.to_string());
            }
        }
        selection
    }

    /// Numeric covariate matrix for `names`, coercing every cell.
    ///
    /// Names are expected to come from [`EntitySeries::select_covariates`];
    /// a name outside the schema yields an all-zero column.
    pub fn exog_matrix(&self, names: &[String]) -> Result<ExogMatrix> {
        let columns = names
            .iter()
            .map(|name| self.records.iter().map(|r| r.covariate(name)).collect())
            .collect();
        ExogMatrix::new(names.to_vec(), columns, self.records.len())
    }

    /// Records `start..end` as a new series sharing this schema.
    pub(crate) fn range(&self, start: usize, end: usize) -> EntitySeries {
        EntitySeries {
            entity_id: self.entity_id.clone(),
            records: self.records[start..end].to_vec(),
            schema: self.schema.clone(),
        }
    }
}
