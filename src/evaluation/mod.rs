//! Entity x feature-set accuracy sweep.

pub mod config;
pub mod orchestrator;
pub mod table;

pub use config::{EvaluationConfig, FeatureSetDefinition};
pub use orchestrator::{
    EvaluationOrchestrator, EvaluationReport, RunOutcome, RunPredictions, SkippedRun,
};
pub use table::{EvaluationResult, ResultTable};
