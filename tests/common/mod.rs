// Shared test helpers: scripted log and status sources, test config

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use futures_util::StreamExt;
use futures_util::stream;
use trainwatch::config::AppConfig;
use trainwatch::error::TelemetryError;
use trainwatch::models::StatusResponse;
use trainwatch::status_poller::StatusSource;
use trainwatch::stream_ingestor::{LogEvents, LogSource, TransportEvent};

pub const TEST_CONFIG: &str = r#"
[server]
port = 8090
host = "127.0.0.1"

[backend]
base_url = "http://127.0.0.1:9"
request_timeout_ms = 500
connect_timeout_ms = 200

[stream]
path = "/stream-logs"
auto_open = false

[status]
path = "/status"
poll_interval_ms = 1000

[portfolio]
path = "/portfolio"
action_logs_path = "/action-logs"
interval_per_step_secs = 60
base_timestamp = "2024-01-01T00:00:00Z"
load_on_start = false
"#;

pub fn test_app_config() -> AppConfig {
    AppConfig::load_from_str(TEST_CONFIG).unwrap()
}

/// Config pointing at a backend on `base_url` (e.g. a throwaway local server).
pub fn config_for(base_url: &str) -> AppConfig {
    let s = TEST_CONFIG.replace("http://127.0.0.1:9", base_url);
    AppConfig::load_from_str(&s).unwrap()
}

/// Serves `app` on an ephemeral port; returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Log source that replays one script per subscription, in subscribe order.
/// With `hold_open`, each subscription stays pending after its script instead
/// of ending.
#[derive(Clone, Default)]
pub struct ScriptedLogSource {
    scripts: Arc<Mutex<VecDeque<Vec<TransportEvent>>>>,
    subscribed: Arc<Mutex<Vec<String>>>,
    hold_open: bool,
}

impl ScriptedLogSource {
    pub fn new(scripts: Vec<Vec<TransportEvent>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            subscribed: Arc::default(),
            hold_open: false,
        }
    }

    pub fn held_open(scripts: Vec<Vec<TransportEvent>>) -> Self {
        Self {
            hold_open: true,
            ..Self::new(scripts)
        }
    }

    /// Endpoints passed to `subscribe`, in call order.
    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.lock().unwrap().clone()
    }
}

impl LogSource for ScriptedLogSource {
    fn subscribe(&self, endpoint: &str) -> LogEvents {
        self.subscribed.lock().unwrap().push(endpoint.to_string());
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        let events = stream::iter(script);
        if self.hold_open {
            events.chain(stream::pending()).boxed()
        } else {
            events.boxed()
        }
    }
}

pub fn line(s: &str) -> TransportEvent {
    TransportEvent::Line(s.to_string())
}

/// Status source answering from a queue of (delay, result). Once the queue
/// is empty, requests never resolve.
#[derive(Clone, Default)]
pub struct ScriptedStatus {
    replies: Arc<Mutex<VecDeque<(Duration, Result<StatusResponse, TelemetryError>)>>>,
}

impl ScriptedStatus {
    pub fn new(replies: Vec<(Duration, Result<StatusResponse, TelemetryError>)>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
        }
    }
}

impl StatusSource for ScriptedStatus {
    async fn fetch_status(&self, _endpoint: &str) -> Result<StatusResponse, TelemetryError> {
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => std::future::pending().await,
        }
    }
}

pub fn sessions(n: u32) -> Result<StatusResponse, TelemetryError> {
    Ok(StatusResponse { active_sessions: n })
}
