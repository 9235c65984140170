//! Evaluate three feature sets on two synthetic terminals and print the accuracy table.
//!
//! Run with `cargo run --example terminal_sweep [config.json]`; set
//! `RUST_LOG=atm_forecast=debug` to see per-fit estimates.

use atm_forecast::core::{RawValue, TimeSeriesRecord};
use atm_forecast::evaluation::{EvaluationConfig, EvaluationOrchestrator, FeatureSetDefinition};
use chrono::{Datelike, Duration, NaiveDate};

fn synthetic_terminal(
    entity: &str,
    base: f64,
    start: NaiveDate,
    days: i64,
) -> Vec<TimeSeriesRecord> {
    let mut history: Vec<f64> = Vec::new();
    (0..days)
        .map(|i| {
            let date = start + Duration::days(i);
            let dow = date.weekday().num_days_from_monday() as f64;
            let holiday = if date.day() == 1 || date.day() == 15 { 1.0 } else { 0.0 };
            let wobble = ((i * 37 % 11) as f64 - 5.0) * 2.0;
            let target = base + 20.0 * dow + 60.0 * holiday + wobble;
            let week_ago = history.len().checked_sub(7).map(|j| history[j]);
            history.push(target);
            TimeSeriesRecord::new(date, entity, target)
                .with_covariate("DAY_OF_WEEK", dow)
                .with_covariate("HOLIDAY", holiday)
                .with_covariate("ATM_WITHDRWLS_1WEEKAGO", RawValue::from(week_ago))
        })
        .collect()
}

fn default_config(start: NaiveDate) -> Result<EvaluationConfig, Box<dyn std::error::Error>> {
    Ok(EvaluationConfig::new(
        start + Duration::days(150),
        vec!["ATM-NORTH".to_string(), "ATM-SOUTH".to_string()],
        vec![
            FeatureSetDefinition::new("F0", ["ATM_WITHDRWLS_1WEEKAGO"])?,
            FeatureSetDefinition::new("F1", ["ATM_WITHDRWLS_1WEEKAGO", "HOLIDAY"])?,
            FeatureSetDefinition::new("F2", ["HOLIDAY", "DAY_OF_WEEK", "ATM_WITHDRWLS_1WEEKAGO"])?,
        ],
    )
    .with_parallel(true))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("atm_forecast=info".parse()?),
        )
        .init();

    let start = NaiveDate::from_ymd_opt(2019, 1, 1).ok_or("invalid start date")?;
    let config = match std::env::args().nth(1) {
        Some(path) => EvaluationConfig::from_json_file(path)?,
        None => default_config(start)?,
    };

    let mut records = synthetic_terminal("ATM-NORTH", 900.0, start, 180);
    records.extend(synthetic_terminal("ATM-SOUTH", 400.0, start, 180));

    let report = EvaluationOrchestrator::new(config)?.run_records(records)?;

    println!(
        "{:<10} {:<4} {:>10} {:>10} {:>10} {:>10} {:>8}",
        "entity", "set", "train_mae", "test_mae", "train_rmse", "test_rmse", "rel_%"
    );
    for row in &report.table {
        println!(
            "{:<10} {:<4} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>8.2}",
            row.entity_id,
            row.feature_set,
            row.train_mae,
            row.test_mae,
            row.train_rmse,
            row.test_rmse,
            row.relative_error_pct
        );
    }

    for skipped in &report.skipped {
        println!("skipped {} / {}: {}", skipped.entity_id, skipped.feature_set, skipped.reason);
    }

    println!();
    for best in report.table.best_per_entity() {
        println!(
            "best for {}: {} (test MAE {:.2})",
            best.entity_id, best.feature_set, best.test_mae
        );
    }

    println!();
    report.table.to_csv_writer(std::io::stdout())?;
    Ok(())
}
