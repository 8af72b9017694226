//! HTTP endpoints for signal-relay.
//!
//! Provides the WebSocket upgrade endpoint, health checks and metrics.

pub mod health;
mod metrics;

use crate::connection::{split_websocket, Connection};
use crate::identity;
use crate::server::SignalRelay;
use crate::session::Session;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::Query;
use axum::http::header::ORIGIN;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Extension, Router};
use serde::Deserialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub use health::HealthStatus;

/// Query parameters of the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    /// Identifier the client wants to register under.
    #[serde(rename = "peerId")]
    pub peer_id: Option<String>,
}

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<SignalRelay>) -> Router {
    let server = &relay.config().server;

    let mut router = Router::new()
        .route(&server.ws_path, get(signal_handler))
        .route("/health", get(health::health_handler));
    if server.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }

    router.layer(Extension(relay))
}

/// WebSocket upgrade endpoint.
///
/// Refuses with `500` when the request is not a usable upgrade, `403` when
/// an origin allow-list is configured and does not match, and `400` when
/// `peerId` is not a UUID. Nothing is registered in any of those cases.
async fn signal_handler(
    Extension(relay): Extension<Arc<SignalRelay>>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::warn!("Error upgrading connection: {}", rejection);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to upgrade to WebSocket",
            )
                .into_response();
        }
    };

    let origin = headers.get(ORIGIN).and_then(|value| value.to_str().ok());
    if !relay.config().server.origin_allowed(origin) {
        tracing::warn!("Rejected connection from origin {:?}", origin);
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }

    let requested = match identity::parse_requested(params.peer_id.as_deref()) {
        Ok(requested) => requested,
        Err(e) => {
            tracing::warn!("Rejected connection: {}", e);
            relay
                .metrics()
                .identity_rejections
                .fetch_add(1, Ordering::Relaxed);
            return (e.status_code(), "Invalid peerId").into_response();
        }
    };

    ws.on_failed_upgrade(|e: axum::Error| tracing::warn!("WebSocket upgrade failed: {}", e))
        .on_upgrade(move |socket| async move {
            let (sink, source) = split_websocket(socket);
            let connection = Arc::new(Connection::new(sink));
            if let Err(e) = Session::new(relay, connection, source).run(requested).await {
                tracing::warn!("Session error: {}", e);
            }
        })
}
