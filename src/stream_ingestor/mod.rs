// Log stream ingestion: one push subscription, one ordered buffer, one lifecycle.
//
// The ingestor is owned by a single task (see `task`). Transport events are
// tagged with the generation that produced them; events from an older
// generation or arriving after close are dropped.

pub mod sse;
pub mod task;

pub use sse::{SseDecoder, SseLogSource};
pub use task::{IngestorCommand, IngestorHandle, spawn};

use futures_util::StreamExt;
use futures_util::stream::BoxStream;

use crate::error::TelemetryError;
use crate::models::{ConnectionState, LogBuffer, LogStatus, LogView};

/// Events produced by a log subscription, in transport order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Line(String),
    Failed(TelemetryError),
}

pub type LogEvents = BoxStream<'static, TransportEvent>;

/// Push transport for log lines.
pub trait LogSource: Send + Sync + 'static {
    /// Lazy subscription: nothing connects until the stream is polled, and
    /// calling again yields a fresh, independent subscription.
    fn subscribe(&self, endpoint: &str) -> LogEvents;
}

/// Marker appended to the buffer when the transport fails.
pub fn failure_marker(reason: &str) -> String {
    format!("Error: Unable to connect to logs ({reason}).")
}

pub struct StreamIngestor<S> {
    source: S,
    endpoint: Option<String>,
    state: ConnectionState,
    generation: u64,
    buffer: LogBuffer,
    events: Option<LogEvents>,
}

impl<S: LogSource> StreamIngestor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            endpoint: None,
            state: ConnectionState::Disconnected,
            generation: 0,
            buffer: LogBuffer::new(),
            events: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }

    /// Subscribes to `endpoint` and moves to `Connecting`. Any previous
    /// subscription is dropped first. Returns the new generation token.
    pub fn open(&mut self, endpoint: &str) -> u64 {
        if self.events.take().is_some() {
            tracing::debug!(generation = self.generation, "dropping previous log subscription");
        }
        self.generation += 1;
        self.endpoint = Some(endpoint.to_string());
        self.events = Some(self.source.subscribe(endpoint));
        self.state = ConnectionState::Connecting;
        tracing::info!(endpoint, generation = self.generation, "opening log stream");
        self.generation
    }

    /// Drops the subscription and moves to `Closed`. Idempotent.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.events = None;
        self.state = ConnectionState::Closed;
        tracing::info!(generation = self.generation, "log stream closed");
    }

    /// Empties the buffer; connection state is untouched. Idempotent.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Applies one transport event. Returns false when the event was discarded
    /// (stale generation, or no live subscription).
    pub fn apply(&mut self, generation: u64, event: TransportEvent) -> bool {
        if generation != self.generation || !self.state.is_live() {
            tracing::trace!(
                generation,
                current = self.generation,
                state = ?self.state,
                "discarding late log event"
            );
            return false;
        }
        match event {
            TransportEvent::Opened => {
                self.state = ConnectionState::Connected;
                tracing::debug!(generation, "log stream connected");
            }
            TransportEvent::Line(line) => {
                // Data is proof of an open connection even if the open signal was not seen.
                self.state = ConnectionState::Connected;
                self.buffer.push(line);
            }
            TransportEvent::Failed(e) => {
                let reason = match &e {
                    TelemetryError::Transport(reason) => reason.clone(),
                    other => other.to_string(),
                };
                tracing::warn!(error = %e, generation, "log stream failed; not reconnecting");
                self.buffer.push(failure_marker(&reason));
                self.close();
            }
        }
        true
    }

    /// Waits for the next transport event and applies it. End of stream counts
    /// as a transport failure. Returns whether the connection is still live.
    /// Cancel-safe: dropping the future loses no event.
    pub async fn pump(&mut self) -> bool {
        let generation = self.generation;
        let Some(events) = self.events.as_mut() else {
            return false;
        };
        let event = events.next().await.unwrap_or_else(|| {
            TransportEvent::Failed(TelemetryError::Transport("stream ended by server".into()))
        });
        self.apply(generation, event);
        self.is_live()
    }

    /// Pumps until the connection is no longer live.
    pub async fn run_until_closed(&mut self) {
        while self.pump().await {}
    }

    /// O(1) summary for publishing after each event.
    pub fn status(&self) -> LogStatus {
        LogStatus {
            state: self.state,
            generation: self.generation,
            len: self.buffer.len(),
            resets: self.buffer.resets(),
        }
    }

    /// Status plus a copy of every line.
    pub fn view(&self) -> LogView {
        LogView {
            state: self.state,
            generation: self.generation,
            lines: self.buffer.lines(),
        }
    }
}
