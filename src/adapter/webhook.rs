use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::error::decode_object;
use super::{AdapterCore, AdapterState, StationAdapter, Strategy};
use crate::ingest::{RecordKind, StationIngest};
use crate::server::metrics;
use crate::stations::StationId;

/// Receives pushed documents on one or more POST paths.
///
/// There is no loop of its own: the routes are mounted on the shared HTTP
/// server, and the adapter state only gates whether calls are accepted.
pub struct WebhookAdapter {
    core: AdapterCore,
    paths: Vec<String>,
}

impl WebhookAdapter {
    pub fn new(ingest: Arc<StationIngest>, kind: RecordKind, paths: Vec<String>) -> Self {
        Self {
            core: AdapterCore::new(ingest, kind),
            paths,
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn routes(self: &Arc<Self>) -> Router {
        self.paths
            .iter()
            .fold(Router::new(), |router, path| {
                router.route(path, post(receive_webhook))
            })
            .with_state(self.clone())
    }
}

async fn receive_webhook(State(adapter): State<Arc<WebhookAdapter>>, body: Bytes) -> Response {
    let station = adapter.core.station_name();
    let kind = adapter.core.kind;

    if adapter.state() == AdapterState::Stopped {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": format!("{} {} webhook is stopped", station, kind)})),
        )
            .into_response();
    }

    match decode_object(&body) {
        Ok(payload) => {
            adapter.core.ingest.ingest(kind, payload);
            Json(json!({"status": "ok"})).into_response()
        }
        Err(e) => {
            warn!("[{}] Rejected {} webhook body: {}", station, kind, e);
            metrics::record_transport_error(station, kind.as_str(), e.label());
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

#[async_trait]
impl StationAdapter for WebhookAdapter {
    fn station(&self) -> StationId {
        self.core.station()
    }

    fn kind(&self) -> RecordKind {
        self.core.kind
    }

    fn strategy(&self) -> Strategy {
        Strategy::Webhook
    }

    fn state(&self) -> AdapterState {
        self.core.lifecycle.state()
    }

    fn start(self: Arc<Self>) -> bool {
        self.core.lifecycle.start_passive()
    }

    fn stop(&self) {
        self.core.lifecycle.stop();
    }

    async fn join(&self, grace: Duration) -> bool {
        self.core.lifecycle.join(grace).await
    }
}
