// Portfolio series: aggregation into buckets and the visible window over them.

pub mod aggregation;
pub mod window;

pub use aggregation::{aggregate, aggregate_by_pseudo_week, pseudo_week_key, step_timestamp};
pub use window::{WindowRange, WindowSelector};

use chrono::{DateTime, TimeDelta, Utc};

use crate::models::{BucketedSeries, Portfolio};

/// Portfolio rows -> raw points -> pseudo-week buckets.
pub fn portfolio_series(
    portfolio: &Portfolio,
    base: DateTime<Utc>,
    interval_per_step: TimeDelta,
) -> BucketedSeries {
    aggregate_by_pseudo_week(&portfolio.points(), base, interval_per_step)
}
