use anyhow::{Context, Result};
use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::metrics::metrics_handler;
use super::{log_requests, state::*, ServerConfig};
use crate::supervisor::{StationStatus, Supervisor};

#[derive(Serialize)]
struct HealthResponse {
    pub uptime: String,
    pub hash: String,
    pub version: String,
    pub stations: Vec<StationStatus>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    Json(HealthResponse {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        version: env!("APP_VERSION").to_string(),
        stations: state.supervisor.statuses(),
    })
}

/// `/health` plus every station's webhook routes, wrapped in request logging.
pub fn make_app(config: ServerConfig, supervisor: Arc<Supervisor>) -> Router {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        hash: env!("GIT_HASH").to_string(),
        supervisor: supervisor.clone(),
    };

    let app: Router = Router::new()
        .route("/health", get(health))
        .with_state(state.clone())
        .merge(supervisor.webhook_router());

    app.layer(middleware::from_fn_with_state(state, log_requests))
}

async fn serve(listener: TcpListener, app: Router, shutdown: CancellationToken) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")
}

pub async fn run_server(
    config: ServerConfig,
    supervisor: Arc<Supervisor>,
    shutdown: CancellationToken,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, supervisor);

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind webhook server to port {}", port))?;
    info!("Webhook server listening on {}", listener.local_addr()?);

    serve(listener, app, shutdown).await
}

pub async fn run_metrics_server(port: u16, shutdown: CancellationToken) -> Result<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind metrics server to port {}", port))?;
    info!("Metrics available at {}/metrics", listener.local_addr()?);

    serve(listener, app, shutdown).await
}
