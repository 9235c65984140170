//! Error types for the atm-forecast library.

use thiserror::Error;

/// Result type alias for evaluation operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while fitting, predicting or evaluating.
///
/// Errors for which [`ForecastError::is_recoverable`] holds are local to a
/// single (entity, feature-set) run and are recorded by the orchestrator;
/// the rest abort the sweep.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Too few observations to estimate the model.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Parameter estimation did not produce a usable model.
    #[error("fit failure: {reason}")]
    FitFailure { reason: String },

    /// The split boundary left no rows to evaluate on.
    #[error("empty test window for entity '{entity_id}'")]
    EmptyTestWindow { entity_id: String },

    /// Two sequences that must align have different lengths.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Batch-level configuration error; fails before any run starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O failure while reading configuration or writing reports.
    #[error("io error: {0}")]
    Io(String),

    /// (De)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ForecastError {
    /// Whether this error only affects a single run and the sweep may continue.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ForecastError::Configuration(_) | ForecastError::Io(_) | ForecastError::Serialization(_)
        )
    }
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        ForecastError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::EmptyData;
        assert_eq!(err.to_string(), "empty input data");

        let err = ForecastError::InsufficientData { needed: 7, got: 3 };
        assert_eq!(err.to_string(), "insufficient data: need at least 7, got 3");

        let err = ForecastError::FitFailure {
            reason: "likelihood is not finite".to_string(),
        };
        assert_eq!(err.to_string(), "fit failure: likelihood is not finite");

        let err = ForecastError::EmptyTestWindow {
            entity_id: "ATM-7".to_string(),
        };
        assert_eq!(err.to_string(), "empty test window for entity 'ATM-7'");

        let err = ForecastError::LengthMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(err.to_string(), "length mismatch: expected 3, got 2");
    }

    #[test]
    fn only_batch_level_errors_are_fatal() {
        assert!(ForecastError::EmptyData.is_recoverable());
        assert!(ForecastError::FitFailure {
            reason: "x".into()
        }
        .is_recoverable());
        assert!(!ForecastError::Configuration("no entities".into()).is_recoverable());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: ForecastError = io.into();
        assert!(matches!(err, ForecastError::Io(msg) if msg.contains("missing.json")));
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ForecastError::EmptyData;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
