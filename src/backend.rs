// Training backend client: status, portfolio and action-log fetches over HTTP.

use std::time::Duration;

use reqwest::Client;
use tracing::instrument;

use crate::config::BackendConfig;
use crate::error::TelemetryError;
use crate::models::{
    ActionLogReport, Portfolio, StatusResponse, parse_action_logs, parse_portfolio,
};
use crate::status_poller::StatusSource;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, TelemetryError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;
        Ok(Self::with_client(
            client,
            &config.base_url,
            Duration::from_millis(config.request_timeout_ms),
        ))
    }

    pub fn with_client(client: Client, base_url: &str, request_timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Absolute URL for a backend path (`/status` -> `http://host:port/status`).
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET returning the raw body, so a parse failure can keep the payload.
    async fn get_text(&self, path: &str) -> Result<String, TelemetryError> {
        let response = self
            .client
            .get(self.url(path))
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    #[instrument(skip(self), fields(operation = "fetch_status"))]
    pub async fn get_status(&self, path: &str) -> Result<StatusResponse, TelemetryError> {
        let raw = self.get_text(path).await?;
        serde_json::from_str(&raw).map_err(|e| TelemetryError::parse(&e, raw))
    }

    #[instrument(skip(self), fields(operation = "fetch_portfolio"))]
    pub async fn fetch_portfolio(&self, path: &str) -> Result<Portfolio, TelemetryError> {
        let raw = self.get_text(path).await?;
        let portfolio = parse_portfolio(&raw)?;
        if portfolio.dropped > 0 {
            tracing::debug!(dropped = portfolio.dropped, "portfolio rows failed validation");
        }
        Ok(portfolio)
    }

    #[instrument(skip(self), fields(operation = "fetch_action_logs"))]
    pub async fn fetch_action_logs(&self, path: &str) -> Result<ActionLogReport, TelemetryError> {
        let raw = self.get_text(path).await?;
        let report = parse_action_logs(&raw)?;
        if report.entries.is_empty() {
            tracing::info!(dropped = report.dropped, "no valid action-log entries");
        }
        Ok(report)
    }
}

impl StatusSource for HttpBackend {
    async fn fetch_status(&self, endpoint: &str) -> Result<StatusResponse, TelemetryError> {
        self.get_status(endpoint).await
    }
}
