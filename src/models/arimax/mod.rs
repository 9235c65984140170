//! ARIMA(1,1,1) with exogenous regressors.

pub mod diff;
pub mod kalman;
mod model;

pub use model::{ARIMASpec, FitOptions, FittedARIMAX, ARIMAX};
