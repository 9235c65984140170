//! Named covariate matrix.

use crate::error::{ForecastError, Result};

/// A `T x K` matrix of covariates stored column-major: `columns[k][t]`.
///
/// `K` may be zero (every covariate of a feature set was dropped); the row
/// count is tracked separately so such a matrix still knows its length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExogMatrix {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    rows: usize,
}

impl ExogMatrix {
    /// Build from named columns of equal length.
    pub fn new(names: Vec<String>, columns: Vec<Vec<f64>>, rows: usize) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(ForecastError::LengthMismatch {
                expected: names.len(),
                got: columns.len(),
            });
        }
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(ForecastError::LengthMismatch {
                expected: rows,
                got: bad.len(),
            });
        }
        Ok(Self {
            names,
            columns,
            rows,
        })
    }

    /// Build from named columns, taking the row count from the first column.
    pub fn from_columns(named: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let rows = named.first().map_or(0, |(_, c)| c.len());
        let (names, columns) = named.into_iter().unzip();
        Self::new(names, columns, rows)
    }

    /// A matrix with `rows` rows and no covariates.
    pub fn empty(rows: usize) -> Self {
        Self {
            names: vec![],
            columns: vec![],
            rows,
        }
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, k: usize) -> &[f64] {
        &self.columns[k]
    }

    /// Row `t` as a freshly allocated vector.
    pub fn row(&self, t: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[t]).collect()
    }

    /// Rows `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.rows {
            return Err(ForecastError::InvalidParameter(format!(
                "row range {}..{} out of bounds for {} rows",
                start, end, self.rows
            )));
        }
        Ok(Self {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c[start..end].to_vec()).collect(),
            rows: end - start,
        })
    }

    /// Whether any cell is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        self.columns.iter().flatten().any(|v| !v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_columns_infers_row_count() {
        let m = ExogMatrix::from_columns(vec![
            ("HOLIDAY".into(), vec![0.0, 1.0, 0.0]),
            ("DAY_OF_WEEK".into(), vec![1.0, 2.0, 3.0]),
        ])
        .unwrap();

        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 2);
        assert_eq!(m.row(1), vec![1.0, 2.0]);
        assert_eq!(m.names(), &["HOLIDAY".to_string(), "DAY_OF_WEEK".to_string()]);
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let err = ExogMatrix::from_columns(vec![
            ("a".into(), vec![0.0, 1.0]),
            ("b".into(), vec![1.0]),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            ForecastError::LengthMismatch {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn empty_matrix_keeps_its_length() {
        let m = ExogMatrix::empty(5);
        assert_eq!(m.nrows(), 5);
        assert_eq!(m.ncols(), 0);
        assert!(m.row(3).is_empty());
        assert_eq!(m.slice(1, 4).unwrap().nrows(), 3);
    }

    #[test]
    fn slice_bounds_are_checked() {
        let m = ExogMatrix::from_columns(vec![("a".into(), vec![1.0, 2.0, 3.0])]).unwrap();
        assert_eq!(m.slice(1, 3).unwrap().column(0), &[2.0, 3.0]);
        assert!(m.slice(2, 4).is_err());
    }
}
