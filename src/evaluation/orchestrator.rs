//! Best-effort sweep over the entity x feature-set grid.
//!
//! Every (entity, feature-set) pair is an independent run: select covariates,
//! split, fit, predict, score. A run that cannot be scored is recorded as
//! skipped and the sweep moves on; only configuration errors abort the batch.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::core::{EntitySeries, PredictionSeries, TimeSeriesRecord};
use crate::error::{ForecastError, Result};
use crate::evaluation::config::{EvaluationConfig, FeatureSetDefinition};
use crate::evaluation::table::{EvaluationResult, ResultTable};
use crate::models::{ExogForecaster, FittedForecaster, ARIMAX};
use crate::utils::metrics::calculate_metrics;
use crate::utils::partition::SeriesPartitioner;

/// A run that produced no result row, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRun {
    pub entity_id: String,
    pub feature_set: String,
    pub reason: ForecastError,
}

/// Actual and predicted values of one run, for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPredictions {
    pub entity_id: String,
    pub feature_set: String,
    pub train_actual: PredictionSeries,
    pub train_predicted: PredictionSeries,
    pub test_actual: PredictionSeries,
    pub test_predicted: PredictionSeries,
}

/// Result of a single (entity, feature-set) run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Evaluated {
        result: EvaluationResult,
        predictions: Option<RunPredictions>,
    },
    Skipped(SkippedRun),
}

/// Everything a sweep produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    /// One row per evaluated pair, in definition order.
    pub table: ResultTable,
    /// Pairs that could not be evaluated, in definition order.
    pub skipped: Vec<SkippedRun>,
    /// Captured series, only when `capture_predictions` is enabled.
    pub predictions: Vec<RunPredictions>,
}

impl EvaluationReport {
    fn merge(outcomes: Vec<RunOutcome>) -> Self {
        let mut report = EvaluationReport::default();
        for outcome in outcomes {
            match outcome {
                RunOutcome::Evaluated {
                    result,
                    predictions,
                } => {
                    report.table.push(result);
                    report.predictions.extend(predictions);
                }
                RunOutcome::Skipped(skipped) => report.skipped.push(skipped),
            }
        }
        report
    }

    /// Total number of runs attempted.
    pub fn runs(&self) -> usize {
        self.table.len() + self.skipped.len()
    }
}

/// Runs the evaluation grid defined by an [`EvaluationConfig`].
///
/// # Example
/// ```
/// use atm_forecast::core::TimeSeriesRecord;
/// use atm_forecast::evaluation::{EvaluationConfig, EvaluationOrchestrator, FeatureSetDefinition};
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
/// let records: Vec<_> = (0..40)
///     .map(|i| {
///         TimeSeriesRecord::new(start + chrono::Duration::days(i), "ATM-1", 100.0)
///             .with_covariate("HOLIDAY", 0.0)
///     })
///     .collect();
///
/// let config = EvaluationConfig::new(
///     NaiveDate::from_ymd_opt(2019, 2, 1).unwrap(),
///     vec!["ATM-1".to_string()],
///     vec![FeatureSetDefinition::new("F0", ["HOLIDAY"]).unwrap()],
/// );
///
/// let report = EvaluationOrchestrator::new(config).unwrap().run_records(records).unwrap();
/// assert_eq!(report.table.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct EvaluationOrchestrator<M = ARIMAX> {
    config: EvaluationConfig,
    partitioner: SeriesPartitioner,
    model: M,
}

impl EvaluationOrchestrator<ARIMAX> {
    /// Orchestrator fitting [`ARIMAX`] with the configured fit options.
    pub fn new(config: EvaluationConfig) -> Result<Self> {
        let model = ARIMAX::with_options(config.fit.clone());
        Self::with_model(config, model)
    }
}

impl<M: ExogForecaster> EvaluationOrchestrator<M> {
    /// Validate `config` and pair it with a model.
    pub fn with_model(config: EvaluationConfig, model: M) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            partitioner: SeriesPartitioner::new(config.split_date),
            config,
            model,
        })
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Group raw records by entity and run the sweep.
    ///
    /// An entity whose records fail validation (a repeated date)
    /// has every configured pair skipped with that error; the other entities
    /// are evaluated as usual.
    pub fn run_records(&self, records: Vec<TimeSeriesRecord>) -> Result<EvaluationReport> {
        let mut series = Vec::new();
        let mut invalid = HashMap::new();
        for (entity_id, grouped) in EntitySeries::group_each(records) {
            match grouped {
                Ok(s) => series.push(s),
                Err(err) if err.is_recoverable() => {
                    invalid.entry(entity_id).or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }
        self.sweep(&series, &invalid)
    }

    /// Evaluate every configured (entity, feature-set) pair against `series`.
    ///
    /// Configured entities missing from `series` are skipped with
    /// [`ForecastError::EmptyData`]. The report is identical whether or not
    /// the grid runs in parallel. Only errors that are not recoverable
    /// (see [`ForecastError::is_recoverable`]) abort the sweep.
    pub fn run(&self, series: &[EntitySeries]) -> Result<EvaluationReport> {
        self.sweep(series, &HashMap::new())
    }

    fn sweep(
        &self,
        series: &[EntitySeries],
        invalid: &HashMap<String, ForecastError>,
    ) -> Result<EvaluationReport> {
        let mut by_entity: HashMap<&str, &EntitySeries> = HashMap::new();
        for s in series {
            by_entity.entry(s.entity_id()).or_insert(s);
        }

        let grid: Vec<(usize, usize)> = (0..self.config.entities.len())
            .flat_map(|e| (0..self.config.feature_sets.len()).map(move |f| (e, f)))
            .collect();

        info!(
            entities = self.config.entities.len(),
            feature_sets = self.config.feature_sets.len(),
            invalid_entities = invalid.len(),
            model = self.model.name(),
            parallel = self.config.parallel,
            "starting evaluation sweep"
        );

        let run_cell = |&(e, f): &(usize, usize)| {
            let entity_id = &self.config.entities[e];
            let feature_set = &self.config.feature_sets[f];
            let outcome = match (by_entity.get(entity_id.as_str()), invalid.get(entity_id)) {
                (Some(s), _) => self.run_pair(s, feature_set),
                (None, Some(err)) => Err(err.clone()),
                (None, None) => Err(ForecastError::EmptyData),
            };
            self.record_outcome(entity_id, feature_set, outcome)
                .map(|outcome| ((e, f), outcome))
        };

        let mut outcomes: Vec<((usize, usize), RunOutcome)> = if self.config.parallel {
            grid.par_iter().map(run_cell).collect::<Result<_>>()?
        } else {
            grid.iter().map(run_cell).collect::<Result<_>>()?
        };
        outcomes.sort_by_key(|(cell, _)| *cell);

        let report = EvaluationReport::merge(outcomes.into_iter().map(|(_, o)| o).collect());

        info!(
            evaluated = report.table.len(),
            skipped = report.skipped.len(),
            "evaluation sweep finished"
        );
        Ok(report)
    }

    /// Evaluate one feature set on one entity.
    ///
    /// Recoverable errors are the reasons a run is skipped during a sweep.
    pub fn evaluate_pair(
        &self,
        series: &EntitySeries,
        feature_set: &FeatureSetDefinition,
    ) -> Result<EvaluationResult> {
        self.run_pair(series, feature_set).map(|(result, _)| result)
    }

    fn run_pair(
        &self,
        series: &EntitySeries,
        feature_set: &FeatureSetDefinition,
    ) -> Result<(EvaluationResult, Option<RunPredictions>)> {
        let selection = series.select_covariates(&feature_set.covariates);
        if selection.is_degraded() {
            debug!(
                entity = series.entity_id(),
                feature_set = %feature_set.name,
                dropped = ?selection.dropped,
                "covariates absent from schema dropped"
            );
        }

        let split = self.partitioner.split_for_evaluation(series)?;
        let train_y = split.train.target_values();
        let train_x = split.train.exog_matrix(&selection.selected)?;
        let test_y = split.test.target_values();
        let test_x = split.test.exog_matrix(&selection.selected)?;

        let fitted = self.model.fit(&train_y, &train_x)?;

        let n_train = train_y.len();
        let train_pred = fitted.predict(0..n_train, &test_x)?;
        let test_pred = fitted.predict(n_train..n_train + test_y.len(), &test_x)?;

        let train_metrics = calculate_metrics(&train_y, &train_pred)?;
        let test_metrics = calculate_metrics(&test_y, &test_pred)?;

        let result = EvaluationResult {
            entity_id: series.entity_id().to_string(),
            feature_set: feature_set.name.clone(),
            train_mae: train_metrics.mae,
            test_mae: test_metrics.mae,
            train_rmse: train_metrics.rmse,
            test_rmse: test_metrics.rmse,
            relative_error_pct: test_metrics.relative_error_pct(),
        };

        let predictions = if self.config.capture_predictions {
            let train_dates = split.train.timestamps();
            let test_dates = split.test.timestamps();
            Some(RunPredictions {
                entity_id: result.entity_id.clone(),
                feature_set: result.feature_set.clone(),
                train_actual: PredictionSeries::new(train_dates.clone(), train_y)?,
                train_predicted: PredictionSeries::new(train_dates, train_pred)?,
                test_actual: PredictionSeries::new(test_dates.clone(), test_y)?,
                test_predicted: PredictionSeries::new(test_dates, test_pred)?,
            })
        } else {
            None
        };

        Ok((result, predictions))
    }

    /// Turn a run's result into an outcome; errors that are not local to
    /// the run are handed back to abort the sweep.
    fn record_outcome(
        &self,
        entity_id: &str,
        feature_set: &FeatureSetDefinition,
        outcome: Result<(EvaluationResult, Option<RunPredictions>)>,
    ) -> Result<RunOutcome> {
        let outcome = match outcome {
            Ok((result, predictions)) => {
                if result.has_undefined_scale() {
                    debug!(
                        entity = entity_id,
                        feature_set = %feature_set.name,
                        "test mean is zero; relative error undefined"
                    );
                }
                RunOutcome::Evaluated {
                    result,
                    predictions,
                }
            }
            Err(reason) if !reason.is_recoverable() => {
                error!(
                    entity = entity_id,
                    feature_set = %feature_set.name,
                    reason = %reason,
                    "sweep aborted"
                );
                return Err(reason);
            }
            Err(reason) => {
                warn!(
                    entity = entity_id,
                    feature_set = %feature_set.name,
                    reason = %reason,
                    "run skipped"
                );
                RunOutcome::Skipped(SkippedRun {
                    entity_id: entity_id.to_string(),
                    feature_set: feature_set.name.clone(),
                    reason,
                })
            }
        };
        Ok(outcome)
    }
}
