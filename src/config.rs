use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub stream: StreamConfig,
    pub status: StatusConfig,
    pub portfolio: PortfolioConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    /// Timeout for status/portfolio/action-log requests. Not applied to the log stream.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    pub path: String,
    /// Open the log stream at startup.
    #[serde(default = "default_true")]
    pub auto_open: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    pub path: String,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioConfig {
    pub path: String,
    pub action_logs_path: String,
    /// Wall-clock time one training step stands for.
    #[serde(default = "default_interval_per_step_secs")]
    pub interval_per_step_secs: u64,
    /// Time of step 0 (RFC 3339). When unset, the time of each fetch is used.
    #[serde(default)]
    pub base_timestamp: Option<String>,
    #[serde(default = "default_true")]
    pub load_on_start: bool,
}

fn default_interval_per_step_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Ping interval for /ws/telemetry clients.
    #[serde(default = "default_ws_ping_interval_secs")]
    pub ws_ping_interval_secs: u64,
}

fn default_ws_ping_interval_secs() -> u64 {
    30
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            ws_ping_interval_secs: default_ws_ping_interval_secs(),
        }
    }
}

impl PortfolioConfig {
    pub fn interval_per_step(&self) -> TimeDelta {
        i64::try_from(self.interval_per_step_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Configured base timestamp, or `now` when none is set.
    pub fn base_or(&self, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
        match &self.base_timestamp {
            Some(s) => Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc)),
            None => Ok(now),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Absolute URL of the log stream.
    pub fn stream_url(&self) -> String {
        format!(
            "{}{}",
            self.backend.base_url.trim_end_matches('/'),
            self.stream.path
        )
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(
            self.backend.base_url.starts_with("http://")
                || self.backend.base_url.starts_with("https://"),
            "backend.base_url must start with http:// or https://, got {:?}",
            self.backend.base_url
        );
        anyhow::ensure!(
            self.backend.request_timeout_ms > 0,
            "backend.request_timeout_ms must be > 0, got {}",
            self.backend.request_timeout_ms
        );
        anyhow::ensure!(
            self.backend.connect_timeout_ms > 0,
            "backend.connect_timeout_ms must be > 0, got {}",
            self.backend.connect_timeout_ms
        );
        for (name, path) in [
            ("stream.path", &self.stream.path),
            ("status.path", &self.status.path),
            ("portfolio.path", &self.portfolio.path),
            ("portfolio.action_logs_path", &self.portfolio.action_logs_path),
        ] {
            anyhow::ensure!(path.starts_with('/'), "{} must start with '/', got {:?}", name, path);
        }
        anyhow::ensure!(
            self.status.poll_interval_ms > 0,
            "status.poll_interval_ms must be > 0, got {}",
            self.status.poll_interval_ms
        );
        anyhow::ensure!(
            self.portfolio.interval_per_step_secs > 0,
            "portfolio.interval_per_step_secs must be > 0, got {}",
            self.portfolio.interval_per_step_secs
        );
        if let Some(ts) = &self.portfolio.base_timestamp {
            anyhow::ensure!(
                DateTime::parse_from_rfc3339(ts).is_ok(),
                "portfolio.base_timestamp must be RFC 3339, got {:?}",
                ts
            );
        }
        anyhow::ensure!(
            self.publishing.ws_ping_interval_secs > 0,
            "publishing.ws_ping_interval_secs must be > 0, got {}",
            self.publishing.ws_ping_interval_secs
        );
        Ok(())
    }
}
