// HTTP + WebSocket routes: plain-data outputs for the presentation layer

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::dashboard::Dashboard;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) dashboard: Arc<Dashboard>,
    pub(crate) ws_ping_interval: Duration,
}

pub fn app(dashboard: Arc<Dashboard>) -> Router {
    let ws_ping_interval =
        Duration::from_secs(dashboard.config().publishing.ws_ping_interval_secs);
    let state = AppState {
        dashboard,
        ws_ping_interval,
    };
    Router::new()
        .route("/", get(|| async { "trainwatch: training telemetry" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/logs", get(http::logs_handler)) // GET /api/logs
        .route("/api/logs/open", post(http::logs_open_handler)) // POST /api/logs/open
        .route("/api/logs/clear", post(http::logs_clear_handler)) // POST /api/logs/clear
        .route("/api/logs/close", post(http::logs_close_handler)) // POST /api/logs/close
        .route("/api/status", get(http::status_handler)) // GET /api/status
        .route("/api/series", get(http::series_handler)) // GET /api/series
        .route("/api/series/window", put(http::series_window_handler)) // PUT /api/series/window
        .route("/api/series/refresh", post(http::series_refresh_handler)) // POST /api/series/refresh
        .route("/api/action-logs", get(http::action_logs_handler)) // GET /api/action-logs
        .route("/ws/telemetry", get(ws::ws_telemetry)) // WS /ws/telemetry
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
