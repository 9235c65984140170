//! Forecasting models.

mod traits;

pub mod arimax;

pub use arimax::{ARIMASpec, FitOptions, FittedARIMAX, ARIMAX};
pub use traits::{ExogForecaster, FittedForecaster};
