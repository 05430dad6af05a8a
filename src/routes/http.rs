// GET/POST/PUT handlers over the dashboard state

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::error::TelemetryError;
use crate::stream_ingestor::IngestorCommand;
use crate::version::BUILD;

/// GET /version: service name and version.
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(BUILD)
}

/// GET /api/logs: connection state plus buffered lines, also as one text block.
pub(super) async fn logs_handler(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.dashboard.logs().view();
    Json(serde_json::json!({
        "state": view.state,
        "generation": view.generation,
        "text": view.text(),
        "lines": view.lines,
    }))
}

pub(super) async fn logs_open_handler(State(state): State<AppState>) -> Response {
    accepted(state.dashboard.open_logs().await)
}

pub(super) async fn logs_clear_handler(State(state): State<AppState>) -> Response {
    accepted(state.dashboard.logs().send(IngestorCommand::Clear).await)
}

pub(super) async fn logs_close_handler(State(state): State<AppState>) -> Response {
    accepted(state.dashboard.logs().send(IngestorCommand::Close).await)
}

fn accepted(delivered: bool) -> Response {
    if delivered {
        StatusCode::ACCEPTED.into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "log ingestor is not running" })),
        )
            .into_response()
    }
}

/// GET /api/status: latest snapshot, error flag and counters.
pub(super) async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.status())
}

/// GET /api/series: visible slice of the bucketed portfolio series.
pub(super) async fn series_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.series_window().await)
}

#[derive(Debug, Deserialize)]
pub(super) struct WindowRequest {
    lo: usize,
    hi: usize,
}

/// PUT /api/series/window sets the range; the response carries the clamped result.
pub(super) async fn series_window_handler(
    State(state): State<AppState>,
    Json(req): Json<WindowRequest>,
) -> impl IntoResponse {
    Json(state.dashboard.set_window(req.lo, req.hi).await)
}

/// POST /api/series/refresh: refetch the portfolio and rebuild the series.
pub(super) async fn series_refresh_handler(State(state): State<AppState>) -> Response {
    match state.dashboard.refresh_portfolio().await {
        Ok(window) => Json(window).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/action-logs: valid entries only; `dropped` counts the rest.
pub(super) async fn action_logs_handler(State(state): State<AppState>) -> Response {
    match state.dashboard.action_logs().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: TelemetryError) -> Response {
    tracing::warn!(error = %e, "backend fetch failed");
    let body = match e.raw_payload() {
        Some(raw) => serde_json::json!({ "error": e.to_string(), "raw": raw }),
        None => serde_json::json!({ "error": e.to_string() }),
    };
    (StatusCode::BAD_GATEWAY, Json(body)).into_response()
}
