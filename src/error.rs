// Error taxonomy for the telemetry core.
// Each variant is local to one data source; none of them stops the others.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    /// Log stream connection failed or ended. Terminal for that connection.
    #[error("transport error: {0}")]
    Transport(String),

    /// HTTP request for a JSON resource failed (connect error, non-success status).
    #[error("request failed: {0}")]
    Request(String),

    /// Response body was not the expected JSON. `raw` keeps the payload for diagnosis.
    #[error("parse error: {message}")]
    Parse { message: String, raw: String },

    /// A fetched record was missing or had invalid fields.
    #[error("validation error: {0}")]
    Validation(String),

    /// Status poll failed; the previous snapshot stays in place.
    #[error("status poll failed: {0}")]
    Poll(String),
}

impl TelemetryError {
    pub fn parse(err: &serde_json::Error, raw: impl Into<String>) -> Self {
        Self::Parse {
            message: err.to_string(),
            raw: raw.into(),
        }
    }

    /// Raw payload of a parse error, if any.
    pub fn raw_payload(&self) -> Option<&str> {
        match self {
            Self::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TelemetryError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}
