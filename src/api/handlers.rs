//! HTTP API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tokio::sync::watch;

use crate::bot::BotSnapshot;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Latest snapshot published by the trading loop.
    pub snapshot: watch::Receiver<BotSnapshot>,
    /// Prometheus recorder, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("snapshot", &*self.snapshot.borrow())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// Create new app state.
    pub fn new(snapshot: watch::Receiver<BotSnapshot>, metrics: Option<PrometheusHandle>) -> Self {
        Self { snapshot, metrics }
    }

    /// Check if ready: the loop finished at least one tick.
    pub fn is_ready(&self) -> bool {
        self.snapshot.borrow().is_ready()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether service is ready.
    pub ready: bool,
    /// Ticks completed.
    pub ticks: u64,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Trading loop snapshot.
    #[serde(flatten)]
    pub snapshot: BotSnapshot,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let ticks = state.snapshot.borrow().ticks;
    let response = ReadyResponse {
        ready: ticks > 0,
        ticks,
    };

    if response.ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns the latest loop snapshot.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot.borrow().clone();
    let status = if snapshot.is_ready() { "running" } else { "starting" };

    Json(StatusResponse { status, snapshot })
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}
