// Explicit composition of the telemetry components. Passed to the router as
// state; torn down through `DashboardTasks::shutdown`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{RwLock, oneshot, watch};

use crate::backend::HttpBackend;
use crate::config::AppConfig;
use crate::error::TelemetryError;
use crate::models::{ActionLogReport, PollState, RealWorldSpan, SeriesWindow};
use crate::series::{WindowSelector, portfolio_series};
use crate::status_poller::{self, PollerHandle};
use crate::stream_ingestor::{self, IngestorHandle, SseLogSource};

pub struct Dashboard {
    config: AppConfig,
    backend: HttpBackend,
    logs: IngestorHandle,
    status: watch::Receiver<PollState>,
    /// None until the first portfolio load.
    series: RwLock<Option<WindowSelector>>,
}

/// Owned background work behind a Dashboard.
pub struct DashboardTasks {
    poller: PollerHandle,
    ingestor_shutdown: oneshot::Sender<()>,
    ingestor_task: tokio::task::JoinHandle<()>,
}

impl DashboardTasks {
    pub fn new(
        poller: PollerHandle,
        ingestor_shutdown: oneshot::Sender<()>,
        ingestor_task: tokio::task::JoinHandle<()>,
    ) -> Self {
        Self {
            poller,
            ingestor_shutdown,
            ingestor_task,
        }
    }

    /// Stops the poller, closes the log stream and waits for both tasks.
    pub async fn shutdown(self) {
        self.poller.stop().await;
        let _ = self.ingestor_shutdown.send(());
        if let Err(e) = self.ingestor_task.await {
            tracing::warn!(error = %e, "log ingestor task ended abnormally");
        }
        tracing::info!("dashboard tasks stopped");
    }
}

impl Dashboard {
    /// Spawns the log ingestor and status poller against the configured backend.
    /// The log stream is not opened here.
    pub fn start(config: AppConfig) -> anyhow::Result<(Arc<Self>, DashboardTasks)> {
        let backend = HttpBackend::new(&config.backend)?;
        let source =
            SseLogSource::new(Duration::from_millis(config.backend.connect_timeout_ms))?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (logs, ingestor_task) = stream_ingestor::spawn(source, shutdown_rx);
        let poller = status_poller::start(
            backend.clone(),
            config.status.path.clone(),
            Duration::from_millis(config.status.poll_interval_ms),
        );
        let dashboard = Self::from_parts(config, backend, logs, poller.subscribe());
        Ok((
            Arc::new(dashboard),
            DashboardTasks::new(poller, shutdown_tx, ingestor_task),
        ))
    }

    pub fn from_parts(
        config: AppConfig,
        backend: HttpBackend,
        logs: IngestorHandle,
        status: watch::Receiver<PollState>,
    ) -> Self {
        Self {
            config,
            backend,
            logs,
            status,
            series: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn logs(&self) -> &IngestorHandle {
        &self.logs
    }

    pub fn status(&self) -> PollState {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PollState> {
        self.status.clone()
    }

    /// Opens (or reopens) the configured log stream.
    pub async fn open_logs(&self) -> bool {
        self.logs.open(self.config.stream_url()).await
    }

    pub async fn series_window(&self) -> SeriesWindow {
        self.series
            .read()
            .await
            .as_ref()
            .map(WindowSelector::window)
            .unwrap_or_default()
    }

    pub async fn set_window(&self, lo: usize, hi: usize) -> SeriesWindow {
        let mut guard = self.series.write().await;
        match guard.as_mut() {
            Some(selector) => {
                selector.set_range(lo, hi);
                selector.window()
            }
            None => SeriesWindow::default(),
        }
    }

    /// Fetches the portfolio, aggregates it into pseudo-week buckets and swaps
    /// it in. The first load shows the full range; later loads keep the
    /// current window, re-clamped to the new length.
    pub async fn refresh_portfolio(&self) -> Result<SeriesWindow, TelemetryError> {
        let portfolio = self
            .backend
            .fetch_portfolio(&self.config.portfolio.path)
            .await?;
        let base = self
            .config
            .portfolio
            .base_or(Utc::now())
            .map_err(|e| TelemetryError::Validation(e.to_string()))?;
        let series = portfolio_series(&portfolio, base, self.config.portfolio.interval_per_step());
        let steps = portfolio.rows.iter().map(|r| r.step).max().unwrap_or(0);
        let span = RealWorldSpan::for_steps(
            steps,
            Duration::from_secs(self.config.portfolio.interval_per_step_secs),
        );
        tracing::info!(
            rows = portfolio.rows.len(),
            dropped = portfolio.dropped,
            buckets = series.len(),
            total_value = portfolio.total_value,
            span_days = span.days,
            "portfolio series refreshed"
        );
        let mut guard = self.series.write().await;
        match guard.as_mut() {
            Some(selector) => {
                selector.replace_series(series);
            }
            None => *guard = Some(WindowSelector::new(series)),
        }
        Ok(guard
            .as_ref()
            .map(WindowSelector::window)
            .unwrap_or_default())
    }

    pub async fn action_logs(&self) -> Result<ActionLogReport, TelemetryError> {
        self.backend
            .fetch_action_logs(&self.config.portfolio.action_logs_path)
            .await
    }
}
