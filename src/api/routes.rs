//! HTTP API route definitions.

use axum::http::Method;
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health, metrics, ready, status, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    // Read-only dashboard access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Status endpoint
        .route("/api/v1/status", get(status))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::BotSnapshot;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use rust_decimal_macros::dec;
    use tokio::sync::watch;
    use tower::ServiceExt;

    fn app(snapshot: BotSnapshot) -> Router {
        let (_tx, rx) = watch::channel(snapshot);
        create_router(AppState::new(rx, None))
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let response = get(app(BotSnapshot::default()), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_503_before_first_tick() {
        let response = get(app(BotSnapshot::default()), "/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_200_after_first_tick() {
        let snapshot = BotSnapshot {
            ticks: 1,
            ..Default::default()
        };
        let response = get(app(snapshot), "/ready").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_endpoint_serves_snapshot() {
        let snapshot = BotSnapshot {
            mode: "dry_run".to_string(),
            ticks: 3,
            cumulative_profit: dec!(0.28),
            bought_count: 2,
            ..Default::default()
        };
        let response = get(app(snapshot), "/api/v1/status").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["mode"], "dry_run");
        assert_eq!(json["cumulative_profit"], "0.28");
        assert_eq!(json["bought_count"], 2);
    }

    #[tokio::test]
    async fn metrics_endpoint_404_when_disabled() {
        let response = get(app(BotSnapshot::default()), "/metrics").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
