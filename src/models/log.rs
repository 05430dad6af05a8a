// Log stream state: buffer of received lines and connection lifecycle.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

/// One line of log text. Ordered only by arrival.
pub type LogLine = String;

/// Connection lifecycle of a log stream; serializes to lowercase JSON (e.g. "connected").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

impl ConnectionState {
    /// True while a subscription is held (events may still arrive).
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

#[derive(Debug, Default)]
struct LogStore {
    lines: Vec<LogLine>,
    resets: u64,
}

/// Append-only sequence of log lines in arrival order. No eviction.
///
/// Clones share one store: the ingestor writes, everyone else reads. Readers
/// follow it incrementally with a [`LogCursor`], so nothing is copied per line.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    store: Arc<RwLock<LogStore>>,
}

/// Position in a LogBuffer: how many lines were read since the last clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogCursor {
    resets: u64,
    offset: usize,
}

/// Lines appended since a cursor. `reset` means the buffer was cleared in
/// between and `lines` is its whole content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDelta {
    pub reset: bool,
    pub lines: Vec<LogLine>,
    pub cursor: LogCursor,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections never panic midway, so a poisoned lock still holds a valid store.
    fn read(&self) -> RwLockReadGuard<'_, LogStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LogStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, line: impl Into<LogLine>) {
        self.write().lines.push(line.into());
    }

    pub fn clear(&self) {
        let mut store = self.write();
        if !store.lines.is_empty() {
            store.lines.clear();
            store.resets += 1;
        }
    }

    /// Copy of every line.
    pub fn lines(&self) -> Vec<LogLine> {
        self.read().lines.clone()
    }

    pub fn last(&self) -> Option<LogLine> {
        self.read().lines.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.read().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().lines.is_empty()
    }

    /// Number of clears that actually dropped lines.
    pub fn resets(&self) -> u64 {
        self.read().resets
    }

    /// Buffer as display text: every line followed by `\n`.
    pub fn text(&self) -> String {
        let store = self.read();
        let mut out = String::with_capacity(store.lines.iter().map(|l| l.len() + 1).sum());
        for line in &store.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Lines appended after `cursor`, and the cursor to resume from.
    pub fn since(&self, cursor: LogCursor) -> LogDelta {
        let store = self.read();
        let reset = cursor.resets != store.resets;
        let from = if reset {
            0
        } else {
            cursor.offset.min(store.lines.len())
        };
        LogDelta {
            reset,
            lines: store.lines[from..].to_vec(),
            cursor: LogCursor {
                resets: store.resets,
                offset: store.lines.len(),
            },
        }
    }
}

/// Published on every ingestor change. Small and `Copy`: the lines
/// themselves stay in the shared [`LogBuffer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStatus {
    pub state: ConnectionState,
    pub generation: u64,
    pub len: usize,
    pub resets: u64,
}

/// Full picture of a log stream for one-off reads (HTTP).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogView {
    pub state: ConnectionState,
    pub generation: u64,
    pub lines: Vec<LogLine>,
}

impl LogView {
    pub fn text(&self) -> String {
        self.lines.iter().map(|l| format!("{l}\n")).collect()
    }
}
