// Bucketed aggregation of a stepped series: step -> timestamp -> key -> mean.
// Pure and synchronous.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, TimeDelta, Utc};

use crate::models::{Bucket, BucketedSeries, RawDataPoint};

/// Pseudo-week key: `{year}-W{ceil(day_of_month / 7)}`.
///
/// This is not ISO-8601 week numbering. Day 1-7 of every month map to `W1`, so
/// keys collide across months of the same year (Jan 3 and Feb 3 share
/// `2024-W1`) and day 29-31 form a short `W5`. Kept as is for compatibility
/// with existing dashboards.
pub fn pseudo_week_key(timestamp: DateTime<Utc>) -> String {
    let week = timestamp.day().div_ceil(7);
    format!("{}-W{}", timestamp.year(), week)
}

/// Absolute time of a step, or None when it falls outside the representable range.
/// The offset is computed in whole milliseconds.
pub fn step_timestamp(
    base: DateTime<Utc>,
    step: u64,
    interval_per_step: TimeDelta,
) -> Option<DateTime<Utc>> {
    let step = i64::try_from(step).ok()?;
    let millis = interval_per_step.num_milliseconds().checked_mul(step)?;
    base.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

/// Groups `points` into buckets keyed by `bucket_key(base + step * interval_per_step)`.
///
/// Buckets appear in first-encountered key order; points are expected in
/// non-decreasing step order and are never re-sorted here.
pub fn aggregate<F>(
    points: &[RawDataPoint],
    base: DateTime<Utc>,
    interval_per_step: TimeDelta,
    bucket_key: F,
) -> BucketedSeries
where
    F: Fn(DateTime<Utc>) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();

    for point in points {
        let Some(ts) = step_timestamp(base, point.step, interval_per_step) else {
            tracing::warn!(
                step = point.step,
                operation = "aggregate",
                "step timestamp out of range; point skipped"
            );
            continue;
        };
        let key = bucket_key(ts);
        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                groups.push((key.clone(), Vec::new()));
                index.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].1.push(point.value);
    }

    let buckets = groups
        .into_iter()
        .map(|(key, members)| Bucket {
            mean: mean_f64(&members),
            key,
            members,
        })
        .collect();
    BucketedSeries::new(buckets)
}

/// `aggregate` with the pseudo-week key.
pub fn aggregate_by_pseudo_week(
    points: &[RawDataPoint],
    base: DateTime<Utc>,
    interval_per_step: TimeDelta,
) -> BucketedSeries {
    aggregate(points, base, interval_per_step, pseudo_week_key)
}

fn mean_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / (v.len() as f64)
}
