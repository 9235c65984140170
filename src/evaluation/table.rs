//! Accumulated accuracy results of an evaluation sweep.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::metrics::is_undefined_scale;

/// Accuracy of one (entity, feature-set) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub entity_id: String,
    pub feature_set: String,
    pub train_mae: f64,
    pub test_mae: f64,
    pub train_rmse: f64,
    pub test_rmse: f64,
    /// Test MAE as a percentage of the test mean; `+inf` when that mean is 0.
    pub relative_error_pct: f64,
}

impl EvaluationResult {
    pub fn has_undefined_scale(&self) -> bool {
        is_undefined_scale(self.relative_error_pct)
    }
}

/// Append-only, ordered collection of [`EvaluationResult`]s.
///
/// Rows keep insertion order. Processing the same (entity, feature-set)
/// pair twice yields two rows; use [`ResultTable::deduplicated`] to collapse
/// them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    rows: Vec<EvaluationResult>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: EvaluationResult) {
        self.rows.push(result);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EvaluationResult> {
        self.rows.iter()
    }

    /// Read-only view of the rows in insertion order.
    pub fn snapshot(&self) -> &[EvaluationResult] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<EvaluationResult> {
        self.rows
    }

    /// Row for a given pair; the last one if the pair occurs more than once.
    pub fn get(&self, entity_id: &str, feature_set: &str) -> Option<&EvaluationResult> {
        self.rows
            .iter()
            .rev()
            .find(|r| r.entity_id == entity_id && r.feature_set == feature_set)
    }

    /// Rows stably sorted by position in `entities`, then in `feature_sets`.
    ///
    /// Names not listed sort after listed ones, keeping their relative order.
    pub fn sorted_by_definition_order<E, F>(
        &self,
        entities: &[E],
        feature_sets: &[F],
    ) -> ResultTable
    where
        E: AsRef<str>,
        F: AsRef<str>,
    {
        fn rank(names: &[&str], name: &str) -> usize {
            names.iter().position(|n| *n == name).unwrap_or(usize::MAX)
        }
        let entities: Vec<&str> = entities.iter().map(AsRef::as_ref).collect();
        let feature_sets: Vec<&str> = feature_sets.iter().map(AsRef::as_ref).collect();

        let mut rows = self.rows.clone();
        rows.sort_by_key(|r| {
            (
                rank(&entities, &r.entity_id),
                rank(&feature_sets, &r.feature_set),
            )
        });
        ResultTable { rows }
    }

    /// For each entity, in order of first appearance, the row with the
    /// lowest finite test MAE. Entities with no finite test MAE are left out.
    pub fn best_per_entity(&self) -> Vec<&EvaluationResult> {
        let mut best: Vec<&EvaluationResult> = Vec::new();
        for row in self.rows.iter().filter(|r| r.test_mae.is_finite()) {
            match best.iter_mut().find(|b| b.entity_id == row.entity_id) {
                Some(current) if row.test_mae < current.test_mae => *current = row,
                Some(_) => {}
                None => best.push(row),
            }
        }
        best
    }

    /// One row per (entity, feature-set) pair, keeping the last one
    /// appended, at the position of the pair's first appearance.
    pub fn deduplicated(&self) -> ResultTable {
        let mut rows: Vec<EvaluationResult> = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            match rows
                .iter_mut()
                .find(|r| r.entity_id == row.entity_id && r.feature_set == row.feature_set)
            {
                Some(existing) => *existing = row.clone(),
                None => rows.push(row.clone()),
            }
        }
        ResultTable { rows }
    }

    /// Write the table as CSV with a header row.
    ///
    /// Undefined relative errors are written as `inf`.
    pub fn to_csv_writer<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        if self.rows.is_empty() {
            csv_writer.write_record(CSV_HEADER)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_csv_writer(io::BufWriter::new(file))
    }
}

const CSV_HEADER: [&str; 7] = [
    "entity_id",
    "feature_set",
    "train_mae",
    "test_mae",
    "train_rmse",
    "test_rmse",
    "relative_error_pct",
];

impl Extend<EvaluationResult> for ResultTable {
    fn extend<I: IntoIterator<Item = EvaluationResult>>(&mut self, iter: I) {
        self.rows.extend(iter);
    }
}

impl FromIterator<EvaluationResult> for ResultTable {
    fn from_iter<I: IntoIterator<Item = EvaluationResult>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a EvaluationResult;
    type IntoIter = std::slice::Iter<'a, EvaluationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
