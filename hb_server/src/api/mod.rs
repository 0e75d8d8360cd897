//! HTTP/WebSocket API for the blackjack server.
//!
//! # Endpoints
//!
//! - `GET /` - WebSocket upgrade; a plain HTTP request gets a short text
//!   banner instead
//! - `GET /health` - Server health status
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use hb_server::api::{create_router, AppState};
//! use house_blackjack::{TableActor, TableConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TableConfig::default();
//! let (actor, table) = TableActor::new(config.clone());
//! tokio::spawn(actor.run());
//!
//! let app = create_router(AppState::new(table, config));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5556").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use house_blackjack::{TableConfig, TableHandle};
use serde_json::json;
use std::sync::Arc;

/// State shared by every HTTP handler and WebSocket connection.
#[derive(Clone, Debug)]
pub struct AppState {
    pub table: TableHandle,
    pub config: Arc<TableConfig>,
}

impl AppState {
    pub fn new(table: TableHandle, config: TableConfig) -> Self {
        Self {
            table,
            config: Arc::new(config),
        }
    }
}

/// Create the router for the WebSocket listener.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(websocket::websocket_handler))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check endpoint for monitoring.
///
/// Returns `200 OK` with the current phase and session count while the
/// table is running, `503 Service Unavailable` once it has stopped.
///
/// ```bash
/// curl http://localhost:5556/health
/// # {"status":"healthy","phase":"waiting","players":0}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.table.snapshot().await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "phase": snapshot.phase(),
                "players": snapshot.stats.total_players,
            })),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unavailable",
            })),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use house_blackjack::TableActor;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = TableConfig::default();
        let (actor, table) = TableActor::new(config.clone());
        tokio::spawn(actor.run());
        create_router(AppState::new(table, config))
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["phase"], "waiting");
        assert_eq!(json["players"], 0);
    }

    #[tokio::test]
    async fn test_health_check_after_shutdown() {
        let config = TableConfig::default();
        let (actor, table) = TableActor::new(config.clone());
        let actor = tokio::spawn(actor.run());
        table.shutdown().await.unwrap();
        actor.await.unwrap();

        let response = create_router(AppState::new(table, config))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = test_app()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
