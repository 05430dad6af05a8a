// Visible index range over a bucketed series.
// Invariant after every mutation: 0 <= lo <= hi <= len.

use serde::{Deserialize, Serialize};

use crate::models::{Bucket, BucketedSeries, SeriesWindow};

/// Half-open range `[lo, hi)` into a series of known length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowRange {
    lo: usize,
    hi: usize,
}

impl WindowRange {
    /// Range covering `[0, len)`.
    pub fn full(len: usize) -> Self {
        Self { lo: 0, hi: len }
    }

    /// Clamps both bounds into `[0, len]`, then pulls `hi` up to `lo` if it sits below.
    pub fn clamped(lo: usize, hi: usize, len: usize) -> Self {
        let lo = lo.min(len);
        let hi = hi.min(len).max(lo);
        Self { lo, hi }
    }

    pub fn reclamp(self, len: usize) -> Self {
        Self::clamped(self.lo, self.hi, len)
    }

    pub fn lo(&self) -> usize {
        self.lo
    }

    pub fn hi(&self) -> usize {
        self.hi
    }

    pub fn len(&self) -> usize {
        self.hi - self.lo
    }

    pub fn is_empty(&self) -> bool {
        self.lo == self.hi
    }
}

/// Owns the current series and the range the user is looking at.
///
/// Until the user picks a range, the window follows the full series across reloads.
#[derive(Debug, Clone, Default)]
pub struct WindowSelector {
    series: BucketedSeries,
    range: WindowRange,
    pinned: bool,
}

impl WindowSelector {
    /// Starts on the full range of `series`.
    pub fn new(series: BucketedSeries) -> Self {
        let range = WindowRange::full(series.len());
        Self {
            series,
            range,
            pinned: false,
        }
    }

    pub fn range(&self) -> WindowRange {
        self.range
    }

    pub fn series(&self) -> &BucketedSeries {
        &self.series
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// True once the user has chosen a range.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn set_range(&mut self, lo: usize, hi: usize) -> WindowRange {
        self.range = WindowRange::clamped(lo, hi, self.series.len());
        self.pinned = true;
        self.range
    }

    /// Buckets in `[lo, hi)`.
    pub fn slice(&self) -> &[Bucket] {
        &self.series.buckets()[self.range.lo..self.range.hi]
    }

    /// A user-chosen range is re-clamped against the new length, never reset.
    /// Otherwise the window widens to the full new length.
    pub fn on_series_replaced(&mut self, new_len: usize) -> WindowRange {
        self.range = if self.pinned {
            self.range.reclamp(new_len)
        } else {
            WindowRange::full(new_len)
        };
        self.range
    }

    pub fn replace_series(&mut self, series: BucketedSeries) -> WindowRange {
        let new_len = series.len();
        self.series = series;
        self.on_series_replaced(new_len)
    }

    pub fn window(&self) -> SeriesWindow {
        SeriesWindow {
            lo: self.range.lo,
            hi: self.range.hi,
            total: self.series.len(),
            buckets: self.slice().to_vec(),
        }
    }
}
