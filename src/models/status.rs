// Training status: wire response and the snapshot/poll state derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub active_sessions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub active_sessions: u32,
    pub fetched_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn from_response(response: StatusResponse, fetched_at: DateTime<Utc>) -> Self {
        Self {
            active_sessions: response.active_sessions,
            fetched_at,
        }
    }
}

/// Latest snapshot plus the side-channel error flag and counters.
/// A failed poll sets `last_error` and leaves `snapshot` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollState {
    pub snapshot: Option<StatusSnapshot>,
    pub last_error: Option<String>,
    pub requests_issued: u64,
    pub successes: u64,
    pub failures: u64,
}

impl PollState {
    /// Requests issued but not yet resolved.
    pub fn in_flight(&self) -> u64 {
        self.requests_issued
            .saturating_sub(self.successes + self.failures)
    }
}
