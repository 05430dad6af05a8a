// Aggregation tests: bucket means, order, portfolio series, real-world span

use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use trainwatch::models::{Portfolio, PortfolioRow, RawDataPoint, RealWorldSpan};
use trainwatch::series::{aggregate, aggregate_by_pseudo_week, portfolio_series};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn points(pairs: &[(u64, f64)]) -> Vec<RawDataPoint> {
    pairs.iter().map(|&(s, v)| RawDataPoint::new(s, v)).collect()
}

#[test]
fn test_three_points_one_bucket_mean() {
    let series = aggregate_by_pseudo_week(
        &points(&[(0, 100.0), (1, 102.0), (2, 98.0)]),
        base(),
        TimeDelta::minutes(1),
    );
    assert_eq!(series.len(), 1);
    let bucket = series.get(0).unwrap();
    assert_eq!(bucket.key, "2024-W1");
    assert_eq!(bucket.members, vec![100.0, 102.0, 98.0]);
    assert!((bucket.mean - 100.0).abs() < 1e-9);
}

#[test]
fn test_bucket_mean_is_member_average() {
    // One day per step over three pseudo-weeks.
    let input: Vec<RawDataPoint> = (0..20)
        .map(|s| RawDataPoint::new(s, 1000.0 + (s as f64 * 37.3) % 11.0))
        .collect();
    let series = aggregate_by_pseudo_week(&input, base(), TimeDelta::days(1));
    assert_eq!(series.len(), 3);
    for bucket in series.buckets() {
        let avg = bucket.members.iter().sum::<f64>() / bucket.members.len() as f64;
        assert!((bucket.mean - avg).abs() < 1e-9, "bucket {}", bucket.key);
    }
    let total: usize = series.buckets().iter().map(|b| b.members.len()).sum();
    assert_eq!(total, input.len());
}

#[test]
fn test_buckets_keep_first_occurrence_order() {
    let keys = ["b", "a", "c", "a", "b"];
    let input = points(&[(0, 1.0), (1, 2.0), (2, 3.0), (3, 4.0), (4, 5.0)]);
    let series = aggregate(&input, base(), TimeDelta::minutes(1), |ts| {
        let minute = (ts - base()).num_minutes() as usize;
        keys[minute].to_string()
    });
    assert_eq!(series.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    assert_eq!(series.get(1).unwrap().members, vec![2.0, 4.0]);
    assert_eq!(series.means().collect::<Vec<_>>(), vec![3.0, 3.0, 3.0]);
}

#[test]
fn test_pseudo_week_collision_merges_months() {
    // Jan 3 and Feb 3 share a key, so both land in the first bucket.
    let input = points(&[(2, 10.0), (33, 30.0)]);
    let series = aggregate_by_pseudo_week(&input, base(), TimeDelta::days(1));
    assert_eq!(series.len(), 1);
    assert_eq!(series.get(0).unwrap().mean, 20.0);
}

#[test]
fn test_empty_input_gives_empty_series() {
    let series = aggregate_by_pseudo_week(&[], base(), TimeDelta::minutes(1));
    assert!(series.is_empty());
}

#[test]
fn test_out_of_range_step_is_skipped() {
    let input = points(&[(0, 5.0), (u64::MAX, 1e9), (1, 7.0)]);
    let series = aggregate_by_pseudo_week(&input, base(), TimeDelta::days(1));
    assert_eq!(series.len(), 1);
    assert_eq!(series.get(0).unwrap().members, vec![5.0, 7.0]);
}

#[test]
fn test_bucket_min_max() {
    let series = aggregate_by_pseudo_week(
        &points(&[(0, 100.0), (1, 102.0), (2, 98.0)]),
        base(),
        TimeDelta::minutes(1),
    );
    let bucket = series.get(0).unwrap();
    assert_eq!(bucket.min(), Some(98.0));
    assert_eq!(bucket.max(), Some(102.0));
}

#[test]
fn test_portfolio_series_uses_rows_in_order() {
    let portfolio = Portfolio {
        total_value: 10_500.0,
        rows: (0..10)
            .map(|s| PortfolioRow {
                step: s,
                portfolio_value: 10_000.0 + s as f64 * 100.0,
                action: None,
                price: None,
            })
            .collect(),
        dropped: 0,
    };
    let series = portfolio_series(&portfolio, base(), TimeDelta::days(1));
    assert_eq!(series.keys().collect::<Vec<_>>(), vec!["2024-W1", "2024-W2"]);
    assert_eq!(series.get(0).unwrap().members.len(), 7);
    assert!((series.get(1).unwrap().mean - 10_800.0).abs() < 1e-9);
}

#[test]
fn test_real_world_span() {
    let span = RealWorldSpan::for_steps(2880, Duration::from_secs(60));
    assert_eq!(span.minutes, 2880.0);
    assert_eq!(span.hours, 48.0);
    assert_eq!(span.days, 2.0);
}
