//! Property-based tests for metrics and partitioning.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated series.

use atm_forecast::core::{EntitySeries, TimeSeriesRecord};
use atm_forecast::utils::metrics::{mae, relative_error_pct, rmse};
use atm_forecast::utils::partition::SeriesPartitioner;
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

/// Strategy for equal-length actual/predicted pairs.
fn paired_values(max_len: usize) -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (1..max_len).prop_flat_map(|len| {
        (
            prop::collection::vec(-1e4..1e4_f64, len),
            prop::collection::vec(-1e4..1e4_f64, len),
        )
    })
}

/// Strictly increasing day offsets with gaps.
fn day_offsets(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1..5_i64, 0..max_len).prop_map(|gaps| {
        gaps.iter()
            .scan(0_i64, |day, gap| {
                *day += gap;
                Some(*day)
            })
            .collect()
    })
}

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 6, 1).unwrap()
}

fn series_from_offsets(offsets: &[i64]) -> EntitySeries {
    let records = offsets
        .iter()
        .map(|&d| TimeSeriesRecord::new(base() + Duration::days(d), "ATM-P", d as f64))
        .collect();
    EntitySeries::new("ATM-P", records).unwrap()
}

proptest! {
    #[test]
    fn rmse_is_non_negative((actual, predicted) in paired_values(50)) {
        prop_assert!(rmse(&actual, &predicted).unwrap() >= 0.0);
    }

    #[test]
    fn rmse_is_zero_for_identical_sequences(actual in prop::collection::vec(-1e4..1e4_f64, 1..50)) {
        prop_assert_eq!(rmse(&actual, &actual).unwrap(), 0.0);
        prop_assert_eq!(mae(&actual, &actual).unwrap(), 0.0);
    }

    #[test]
    fn rmse_is_positive_when_any_element_differs(
        actual in prop::collection::vec(-1e4..1e4_f64, 1..50),
        index in any::<prop::sample::Index>(),
        shift in 0.5..100.0_f64,
    ) {
        let mut predicted = actual.clone();
        let i = index.index(actual.len());
        predicted[i] += shift;
        prop_assert!(rmse(&actual, &predicted).unwrap() > 0.0);
    }

    #[test]
    fn mae_never_exceeds_rmse((actual, predicted) in paired_values(50)) {
        let mae = mae(&actual, &predicted).unwrap();
        let rmse = rmse(&actual, &predicted).unwrap();
        prop_assert!(mae <= rmse * (1.0 + 1e-12) + 1e-12, "mae {} > rmse {}", mae, rmse);
    }

    #[test]
    fn length_mismatch_is_always_reported(
        actual in prop::collection::vec(-1e4..1e4_f64, 1..20),
        extra in 1..5_usize,
    ) {
        let predicted = vec![0.0; actual.len() + extra];
        prop_assert!(mae(&actual, &predicted).is_err());
        prop_assert!(rmse(&actual, &predicted).is_err());
    }

    #[test]
    fn relative_error_is_finite_and_non_negative_for_nonzero_mean(
        test_mae in 0.0..1e4_f64,
        mean in prop_oneof![-1e4..-1e-6_f64, 1e-6..1e4_f64],
    ) {
        let pct = relative_error_pct(test_mae, mean);
        prop_assert!(pct.is_finite());
        prop_assert!(pct >= 0.0);
    }

    #[test]
    fn relative_error_is_infinite_for_zero_mean(test_mae in 0.0..1e4_f64) {
        prop_assert_eq!(relative_error_pct(test_mae, 0.0), f64::INFINITY);
    }

    #[test]
    fn partition_covers_every_timestamp_once(
        offsets in day_offsets(60),
        boundary_offset in 0..200_i64,
    ) {
        let series = series_from_offsets(&offsets);
        let boundary = base() + Duration::days(boundary_offset);

        let split = SeriesPartitioner::new(boundary).split(&series);

        let mut rejoined = split.train.timestamps();
        rejoined.extend(split.test.timestamps());
        prop_assert_eq!(rejoined, series.timestamps());
    }

    #[test]
    fn partition_respects_the_boundary(
        offsets in day_offsets(60),
        boundary_offset in 0..200_i64,
    ) {
        let series = series_from_offsets(&offsets);
        let boundary = base() + Duration::days(boundary_offset);

        let split = SeriesPartitioner::new(boundary).split(&series);

        prop_assert!(split.train.timestamps().iter().all(|t| *t < boundary));
        prop_assert!(split.test.timestamps().iter().all(|t| *t >= boundary));
        if let (Some(last_train), Some(first_test)) =
            (split.train.timestamps().last(), split.test.timestamps().first())
        {
            prop_assert!(*last_train < boundary && boundary <= *first_test);
        }
    }
}
