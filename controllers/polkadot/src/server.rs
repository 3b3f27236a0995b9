//! HTTP server for Prometheus metrics and Kubernetes probes.
//!
//! - `/healthz`: liveness, always 200 while the process serves requests
//! - `/readyz`: 200 once the controller has connected and started watching
//! - `/metrics`: Prometheus text format

use crate::error::ControllerError;
use crate::metrics;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// State shared between the controller and the probe handlers
#[derive(Clone)]
pub struct ServerState {
    pub is_ready: Arc<AtomicBool>,
    pub registry: Registry,
}

impl ServerState {
    pub fn new(registry: Registry) -> Self {
        Self {
            is_ready: Arc::new(AtomicBool::new(false)),
            registry,
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::Relaxed);
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve probes and metrics on `0.0.0.0:port` until the process exits
pub async fn start_server(port: u16, state: ServerState) -> Result<(), ControllerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Metrics and probe server listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<ServerState>) -> (StatusCode, &'static str) {
    if state.is_ready.load(Ordering::Relaxed) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn metrics_handler(State(state): State<ServerState>) -> Response {
    match metrics::encode(&state.registry) {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn get_path(state: ServerState, path: &str) -> (StatusCode, String) {
        let response = router(state)
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_healthz_is_always_ok() {
        let (status, body) = get_path(ServerState::new(Registry::new()), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_readyz_follows_ready_flag() {
        let state = ServerState::new(Registry::new());
        let (status, _) = get_path(state.clone(), "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        state.set_ready(true);
        let (status, _) = get_path(state, "/readyz").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_exposes_registry() {
        let registry = Registry::new();
        let metrics = crate::metrics::Metrics::register(&registry).unwrap();
        metrics.observe_outcome(
            cluster_client::DependentKind::Endpoint,
            &crate::reconciler::ReconcileOutcome::Unchanged,
        );

        let (status, body) = get_path(ServerState::new(registry), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("polkadot_dependent_outcomes_total"));
    }
}
