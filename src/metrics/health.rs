//! Health check endpoints and Prometheus metrics server
//!
//! HTTP endpoints for liveness and metrics scraping using Axum.

use crate::metrics::collector::MetricsCollector;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Health server configuration
#[derive(Debug, Clone)]
pub struct HealthServerConfig {
    /// Port to bind the health server to
    pub port: u16,
    /// Host to bind to (typically "0.0.0.0" for all interfaces)
    pub host: String,
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

#[derive(Clone)]
struct HealthServerState {
    metrics_collector: Arc<MetricsCollector>,
    service_name: String,
}

/// Health server that provides HTTP endpoints for monitoring
pub struct HealthServer {
    config: HealthServerConfig,
    state: HealthServerState,
    shutdown_tx: broadcast::Sender<()>,
}

impl HealthServer {
    pub fn new(
        config: HealthServerConfig,
        metrics_collector: Arc<MetricsCollector>,
        service_name: String,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            state: HealthServerState {
                metrics_collector,
                service_name,
            },
            shutdown_tx,
        }
    }

    /// Start serving; resolves when a shutdown signal is broadcast
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid health server address")?;

        let app = Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.clone());

        let listener = TcpListener::bind(addr)
            .await
            .context("Failed to bind health server")?;
        info!("Health server listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
            .context("Health server failed")?;

        Ok(())
    }

    /// Signal the server to shut down
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

async fn health_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": state.service_name,
        "version": crate::VERSION,
    }))
}

async fn metrics_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    let families = state.metrics_collector.registry().gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    match encoder.encode(&families, &mut buffer) {
        Ok(()) => (StatusCode::OK, buffer).into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "encode error").into_response()
        }
    }
}
