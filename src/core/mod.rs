//! Core data structures: records, entity series, covariates and predictions.

mod exog;
mod prediction;
mod record;
mod series;

pub use exog::ExogMatrix;
pub use prediction::PredictionSeries;
pub use record::{coerce_finite, RawValue, TimeSeriesRecord};
pub use series::{CovariateSelection, EntitySeries};
