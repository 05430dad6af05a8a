// WebSocket push of log and status updates

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::{ConnectionState, LogBuffer, LogCursor, LogLine, LogStatus, PollState};

pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Log lines added since the previous frame. With `reset`, the client's
/// copy is stale (first frame, or the buffer was cleared) and `lines` replaces it.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogFrame {
    state: ConnectionState,
    generation: u64,
    reset: bool,
    lines: Vec<LogLine>,
}

#[derive(Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
enum TelemetryFrame<'a> {
    Logs(&'a LogFrame),
    Status(&'a PollState),
}

/// Per-client read position in the shared log buffer.
struct LogFollower {
    buffer: LogBuffer,
    cursor: LogCursor,
    started: bool,
}

impl LogFollower {
    fn new(buffer: LogBuffer) -> Self {
        Self {
            buffer,
            cursor: LogCursor::default(),
            started: false,
        }
    }

    /// Frame for `status`, or None when neither lines nor status changed.
    fn next_frame(&mut self, status: LogStatus, last: Option<LogStatus>) -> Option<LogFrame> {
        let delta = self.buffer.since(self.cursor);
        self.cursor = delta.cursor;
        let reset = delta.reset || !self.started;
        self.started = true;
        let unchanged =
            last.is_some_and(|l| l.state == status.state && l.generation == status.generation);
        if !reset && delta.lines.is_empty() && unchanged {
            return None;
        }
        Some(LogFrame {
            state: status.state,
            generation: status.generation,
            reset,
            lines: delta.lines,
        })
    }
}

pub(super) async fn ws_telemetry(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let logs_rx = state.dashboard.logs().subscribe();
    let follower = LogFollower::new(state.dashboard.logs().buffer().clone());
    let status_rx = state.dashboard.subscribe_status();
    let ping_every = state.ws_ping_interval;
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_telemetry(socket, logs_rx, follower, status_rx, ping_every).await {
            tracing::info!("Telemetry stream error: {}", e);
        }
    })
}

/// Sends one frame; false when the client is gone or too slow.
async fn send_frame(socket: &mut WebSocket, frame: &TelemetryFrame<'_>) -> anyhow::Result<bool> {
    let json = serde_json::to_string(frame)?;
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    Ok(matches!(r, Ok(Ok(()))))
}

async fn stream_telemetry(
    mut socket: WebSocket,
    mut logs_rx: watch::Receiver<LogStatus>,
    mut follower: LogFollower,
    mut status_rx: watch::Receiver<PollState>,
    ping_every: Duration,
) -> anyhow::Result<()> {
    tracing::info!("Client connected to telemetry stream");

    let mut last_logs = *logs_rx.borrow_and_update();
    if let Some(frame) = follower.next_frame(last_logs, None)
        && !send_frame(&mut socket, &TelemetryFrame::Logs(&frame)).await?
    {
        return Ok(());
    }
    let status = status_rx.borrow_and_update().clone();
    if !send_frame(&mut socket, &TelemetryFrame::Status(&status)).await? {
        return Ok(());
    }

    let mut logs_open = true;
    let mut status_open = true;
    let mut ping_interval = tokio::time::interval(ping_every);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ping_interval.tick().await;
    loop {
        tokio::select! {
            changed = logs_rx.changed(), if logs_open => {
                if changed.is_err() {
                    logs_open = false;
                    if !status_open {
                        break;
                    }
                    continue;
                }
                let logs = *logs_rx.borrow_and_update();
                let frame = follower.next_frame(logs, Some(last_logs));
                last_logs = logs;
                if let Some(frame) = frame
                    && !send_frame(&mut socket, &TelemetryFrame::Logs(&frame)).await?
                {
                    break;
                }
            }
            changed = status_rx.changed(), if status_open => {
                if changed.is_err() {
                    status_open = false;
                    if !logs_open {
                        break;
                    }
                    continue;
                }
                let status = status_rx.borrow_and_update().clone();
                if !send_frame(&mut socket, &TelemetryFrame::Status(&status)).await? {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    Ok(())
}
