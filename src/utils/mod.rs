//! Numerical and evaluation utilities.

pub mod linalg;
pub mod metrics;
pub mod optimization;
pub mod partition;

pub use metrics::{calculate_metrics, mae, relative_error_pct, rmse, AccuracyMetrics};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use partition::{SeriesPartitioner, TrainTestSplit};
