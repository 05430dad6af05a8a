// Stepped numeric series and its bucketed form.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDataPoint {
    pub step: u64,
    pub value: f64,
}

impl RawDataPoint {
    pub fn new(step: u64, value: f64) -> Self {
        Self { step, value }
    }
}

/// One aggregation group: key, member values in arrival order, and their mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub key: String,
    pub members: Vec<f64>,
    pub mean: f64,
}

impl Bucket {
    pub fn min(&self) -> Option<f64> {
        self.members.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.members.iter().copied().reduce(f64::max)
    }
}

/// Buckets in first-encountered key order (not sorted by key).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketedSeries {
    buckets: Vec<Bucket>,
}

impl BucketedSeries {
    pub fn new(buckets: Vec<Bucket>) -> Self {
        Self { buckets }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bucket> {
        self.buckets.get(index)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|b| b.key.as_str())
    }

    pub fn means(&self) -> impl Iterator<Item = f64> + '_ {
        self.buckets.iter().map(|b| b.mean)
    }
}

/// Visible part of a bucketed series, as handed to the chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesWindow {
    pub lo: usize,
    pub hi: usize,
    pub total: usize,
    pub buckets: Vec<Bucket>,
}

/// Wall-clock time a run of steps stands for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealWorldSpan {
    pub minutes: f64,
    pub hours: f64,
    pub days: f64,
}

impl RealWorldSpan {
    pub fn for_steps(total_steps: u64, interval_per_step: std::time::Duration) -> Self {
        let minutes = total_steps as f64 * interval_per_step.as_secs_f64() / 60.0;
        Self {
            minutes,
            hours: minutes / 60.0,
            days: minutes / 60.0 / 24.0,
        }
    }
}
