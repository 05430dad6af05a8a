// Recurring, cancellable status fetch.
//
// Every tick spawns an independent request into a JoinSet owned by the poll
// task; results are applied in completion order (last to finish wins). When
// the task exits, the JoinSet is dropped and in-flight requests are aborted,
// so nothing can touch the snapshot after `stop` returns.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::TelemetryError;
use crate::models::{PollState, StatusResponse, StatusSnapshot};

/// Where status comes from. Cloned once per request.
pub trait StatusSource: Clone + Send + Sync + 'static {
    fn fetch_status(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<StatusResponse, TelemetryError>> + Send;
}

/// Running poller. `stop` consumes it; dropping it without `stop` still cancels.
pub struct PollerHandle {
    cancel: CancellationToken,
    state: watch::Receiver<PollState>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl PollerHandle {
    pub fn latest(&self) -> PollState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    /// Cancels the timer and waits for the poll task to finish. No snapshot
    /// update happens after this returns.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "status poller task ended abnormally");
        }
        tracing::debug!("status poller stopped");
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Starts polling `endpoint` every `every`. The first request goes out immediately.
pub fn start<S: StatusSource>(source: S, endpoint: impl Into<String>, every: Duration) -> PollerHandle {
    let cancel = CancellationToken::new();
    let (state_tx, state_rx) = watch::channel(PollState::default());
    let task = tokio::spawn(run(
        source,
        endpoint.into(),
        every,
        state_tx,
        cancel.clone(),
    ));
    PollerHandle {
        cancel,
        state: state_rx,
        task: Some(task),
    }
}

#[instrument(skip(source, state_tx, cancel), fields(interval_ms = every.as_millis() as u64))]
async fn run<S: StatusSource>(
    source: S,
    endpoint: String,
    every: Duration,
    state_tx: watch::Sender<PollState>,
    cancel: CancellationToken,
) {
    let mut tick = interval(every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: JoinSet<Result<StatusResponse, TelemetryError>> = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(joined) = in_flight.join_next() => {
                state_tx.send_modify(|state| apply_result(state, joined));
            }
            _ = tick.tick() => {
                let source = source.clone();
                let endpoint = endpoint.clone();
                in_flight.spawn(async move { source.fetch_status(&endpoint).await });
                state_tx.send_modify(|state| state.requests_issued += 1);
            }
        }
    }
    let aborted = in_flight.len();
    in_flight.abort_all();
    if aborted > 0 {
        tracing::debug!(aborted, "aborted in-flight status requests");
    }
}

fn apply_result(
    state: &mut PollState,
    joined: Result<Result<StatusResponse, TelemetryError>, JoinError>,
) {
    let result = joined
        .map_err(|e| TelemetryError::Poll(e.to_string()))
        .and_then(|r| r);
    match result {
        Ok(response) => {
            state.snapshot = Some(StatusSnapshot::from_response(response, Utc::now()));
            state.last_error = None;
            state.successes += 1;
        }
        Err(e) => {
            let err = match e {
                TelemetryError::Poll(_) => e,
                other => TelemetryError::Poll(other.to_string()),
            };
            tracing::warn!(error = %err, operation = "fetch_status", "keeping previous status snapshot");
            state.last_error = Some(err.to_string());
            state.failures += 1;
        }
    }
}
