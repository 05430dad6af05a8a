// Driver task: sole owner of a StreamIngestor.
// Applies transport events, takes commands over mpsc, publishes LogStatus over watch.
// Lines are read straight from the shared LogBuffer.

use tokio::sync::{mpsc, oneshot, watch};

use super::{LogSource, StreamIngestor};
use crate::models::{LogBuffer, LogStatus, LogView};

const COMMAND_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestorCommand {
    /// (Re)subscribe to the endpoint. Never sent automatically after a failure.
    Open(String),
    Clear,
    Close,
}

/// Cloneable access to a running ingestor: commands in, status and lines out.
#[derive(Debug, Clone)]
pub struct IngestorHandle {
    commands: mpsc::Sender<IngestorCommand>,
    status: watch::Receiver<LogStatus>,
    buffer: LogBuffer,
}

impl IngestorHandle {
    /// Returns false when the driver task has already exited.
    pub async fn send(&self, command: IngestorCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    pub async fn open(&self, endpoint: impl Into<String>) -> bool {
        self.send(IngestorCommand::Open(endpoint.into())).await
    }

    pub async fn clear(&self) -> bool {
        self.send(IngestorCommand::Clear).await
    }

    pub async fn close(&self) -> bool {
        self.send(IngestorCommand::Close).await
    }

    pub fn status(&self) -> LogStatus {
        *self.status.borrow()
    }

    /// Read side of the ingestor's buffer.
    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    /// Latest status with a copy of every buffered line.
    pub fn view(&self) -> LogView {
        let status = self.status();
        LogView {
            state: status.state,
            generation: status.generation,
            lines: self.buffer.lines(),
        }
    }

    /// Changes on every event or command; pair with `buffer().since(..)` to follow new lines.
    pub fn subscribe(&self) -> watch::Receiver<LogStatus> {
        self.status.clone()
    }
}

/// Spawns the driver. It runs until `shutdown_rx` fires or every handle is dropped,
/// closing the stream on the way out.
pub fn spawn<S: LogSource>(
    source: S,
    shutdown_rx: oneshot::Receiver<()>,
) -> (IngestorHandle, tokio::task::JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (status_tx, status_rx) = watch::channel(LogStatus::default());
    let ingestor = StreamIngestor::new(source);
    let handle = IngestorHandle {
        commands: cmd_tx,
        status: status_rx,
        buffer: ingestor.buffer().clone(),
    };
    let join = tokio::spawn(run(ingestor, cmd_rx, status_tx, shutdown_rx));
    (handle, join)
}

async fn run<S: LogSource>(
    mut ingestor: StreamIngestor<S>,
    mut cmd_rx: mpsc::Receiver<IngestorCommand>,
    status_tx: watch::Sender<LogStatus>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => {
                tracing::debug!("Log ingestor shutting down");
                break;
            }
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    tracing::debug!("All ingestor handles dropped");
                    break;
                };
                match cmd {
                    IngestorCommand::Open(endpoint) => {
                        ingestor.open(&endpoint);
                    }
                    IngestorCommand::Clear => ingestor.clear(),
                    IngestorCommand::Close => ingestor.close(),
                }
                status_tx.send_replace(ingestor.status());
            }
            _ = ingestor.pump(), if ingestor.is_live() => {
                status_tx.send_replace(ingestor.status());
            }
        }
    }
    ingestor.close();
    status_tx.send_replace(ingestor.status());
}
