//! Static configuration of an evaluation sweep.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::models::FitOptions;

/// A named, ordered list of covariates forming one candidate model input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSetDefinition {
    pub name: String,
    pub covariates: Vec<String>,
}

impl FeatureSetDefinition {
    /// Create a feature set; at least one covariate is required.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        covariates: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let definition = Self {
            name: name.into(),
            covariates: covariates.into_iter().map(Into::into).collect(),
        };
        definition.validate()?;
        Ok(definition)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ForecastError::Configuration(
                "feature set name must not be empty".to_string(),
            ));
        }
        if self.covariates.is_empty() {
            return Err(ForecastError::Configuration(format!(
                "feature set '{}' has no covariates",
                self.name
            )));
        }
        Ok(())
    }
}

/// Everything an evaluation sweep needs besides the data itself.
///
/// ```
/// use atm_forecast::evaluation::EvaluationConfig;
///
/// let config = EvaluationConfig::from_json_str(r#"{
///     "split_date": "2019-03-01",
///     "entities": ["ATM-1", "ATM-2"],
///     "feature_sets": [
///         {"name": "F0", "covariates": ["HOLIDAY"]},
///         {"name": "F1", "covariates": ["HOLIDAY", "DAY_OF_WEEK"]}
///     ]
/// }"#).unwrap();
///
/// assert_eq!(config.feature_sets[1].name, "F1");
/// assert!(!config.parallel);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// First day of the test window.
    pub split_date: NaiveDate,
    /// Entities to evaluate, in reporting order.
    pub entities: Vec<String>,
    /// Feature sets to evaluate, in reporting order.
    pub feature_sets: Vec<FeatureSetDefinition>,
    #[serde(default)]
    pub fit: FitOptions,
    /// Run the entity x feature-set grid on the rayon pool.
    #[serde(default)]
    pub parallel: bool,
    /// Keep actual-vs-predicted series for every successful run.
    #[serde(default)]
    pub capture_predictions: bool,
}

impl EvaluationConfig {
    pub fn new(
        split_date: NaiveDate,
        entities: Vec<String>,
        feature_sets: Vec<FeatureSetDefinition>,
    ) -> Self {
        Self {
            split_date,
            entities,
            feature_sets,
            fit: FitOptions::default(),
            parallel: false,
            capture_predictions: false,
        }
    }

    pub fn with_fit_options(mut self, fit: FitOptions) -> Self {
        self.fit = fit;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_capture_predictions(mut self, capture: bool) -> Self {
        self.capture_predictions = capture;
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Batch-level checks; a failure here means no run should start.
    pub fn validate(&self) -> Result<()> {
        if self.entities.is_empty() {
            return Err(ForecastError::Configuration(
                "entity list is empty".to_string(),
            ));
        }
        if self.feature_sets.is_empty() {
            return Err(ForecastError::Configuration(
                "no feature sets configured".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for feature_set in &self.feature_sets {
            feature_set.validate()?;
            if !names.insert(feature_set.name.as_str()) {
                return Err(ForecastError::Configuration(format!(
                    "feature set '{}' is defined twice",
                    feature_set.name
                )));
            }
        }

        if self.fit.max_iter == 0 {
            return Err(ForecastError::Configuration(
                "fit.max_iter must be positive".to_string(),
            ));
        }
        if !(self.fit.tolerance.is_finite() && self.fit.tolerance > 0.0) {
            return Err(ForecastError::Configuration(format!(
                "fit.tolerance must be positive, got {}",
                self.fit.tolerance
            )));
        }
        Ok(())
    }
}
