//! HTTP exposition of Prometheus metrics

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Metrics state for the HTTP server
#[derive(Clone)]
pub struct MetricsState {
    pub registry: Arc<prometheus::Registry>,
}

/// Create the metrics router
pub fn metrics_router(registry: Arc<prometheus::Registry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(MetricsState { registry })
}

async fn metrics_handler(
    State(state): State<MetricsState>,
) -> Result<Response, (StatusCode, String)> {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();

    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let response = String::from_utf8(buffer)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        response,
    )
        .into_response())
}

/// Binds `addr` and serves `/metrics` until `shutdown` fires.
///
/// Binding happens before returning so an unusable address fails startup.
pub async fn serve_metrics(
    addr: SocketAddr,
    registry: Arc<prometheus::Registry>,
    mut shutdown: watch::Receiver<()>,
) -> anyhow::Result<JoinHandle<()>> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind metrics listener on {}: {}", addr, e))?;

    info!(addr = %addr, "Serving metrics on /metrics");

    let app = metrics_router(registry);
    Ok(tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await;

        if let Err(e) = served {
            error!(error = %e, "Metrics server stopped with error");
        }
    }))
}
