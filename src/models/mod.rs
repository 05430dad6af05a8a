// Domain models shared by the telemetry components and the HTTP layer

mod log;
mod portfolio;
mod series;
mod status;

pub use log::{ConnectionState, LogBuffer, LogCursor, LogDelta, LogLine, LogStatus, LogView};
pub use portfolio::{
    ActionLogEntry, ActionLogReport, ActionTimestamp, Portfolio, PortfolioRow, TradeAction,
    parse_action_logs, parse_portfolio,
};
pub use series::{Bucket, BucketedSeries, RawDataPoint, RealWorldSpan, SeriesWindow};
pub use status::{PollState, StatusResponse, StatusSnapshot};
