//! HTTP endpoint for Prometheus metrics and health probes

use crate::error::ControllerError;
use crate::metrics::ControllerMetrics;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub metrics: ControllerMetrics,
    ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(metrics: ControllerMetrics) -> Self {
        Self {
            metrics,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the controller ready once its watchers are running
    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Liveness: the process is serving
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness: 200 once the watchers have started, 503 before
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    }
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.export() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; charset=utf-8")],
                e.to_string(),
            )
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the router on `addr` until the task is dropped
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> Result<(), ControllerError> {
    let app = create_router(state);

    info!(addr = %addr, "Starting metrics server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSink;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use kube_store::WorkloadKind;
    use tower::ServiceExt;

    async fn get(router: Router, path: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_healthz_always_ok() {
        let state = Arc::new(AppState::new(ControllerMetrics::new().unwrap()));
        let (status, _) = get(create_router(state), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readyz_follows_ready_flag() {
        let state = Arc::new(AppState::new(ControllerMetrics::new().unwrap()));

        let (status, _) = get(create_router(state.clone()), "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        state.set_ready();
        let (status, _) = get(create_router(state), "/readyz").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_exposes_counters() {
        let metrics = ControllerMetrics::new().unwrap();
        metrics.vpa_created(WorkloadKind::DaemonSet, "kube-system");
        metrics.orphan_deleted("default");
        let state = Arc::new(AppState::new(metrics));

        let (status, body) = get(create_router(state), "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"vpactrl_created_vpa_total{kind="DaemonSet",namespace="kube-system"} 1"#));
        assert!(body.contains(r#"vpactrl_deleted_orphaned_vpa_total{namespace="default"} 1"#));
    }
}
