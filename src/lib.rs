//! # atm-forecast
//!
//! Forecast-accuracy evaluation for cash-dispensing terminals.
//!
//! Fits a regression with ARIMA(1,1,1) errors to every (terminal, feature-set)
//! pair, predicts the held-out window after a calendar split, and collects
//! MAE, RMSE and relative error into one comparable table.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{EntitySeries, ExogMatrix, PredictionSeries, TimeSeriesRecord};
    pub use crate::error::{ForecastError, Result};
    pub use crate::evaluation::{
        EvaluationConfig, EvaluationOrchestrator, EvaluationReport, EvaluationResult,
        FeatureSetDefinition, ResultTable,
    };
    pub use crate::models::{ExogForecaster, FitOptions, FittedForecaster, ARIMAX};
    pub use crate::utils::{calculate_metrics, AccuracyMetrics, SeriesPartitioner};
}
