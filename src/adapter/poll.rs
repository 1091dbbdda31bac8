use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{AdapterCore, AdapterState, StationAdapter, Strategy, TransportError};
use super::error::decode_object;
use crate::ingest::{IngestOutcome, RecordKind, StationIngest};
use crate::server::metrics;
use crate::stations::StationId;

/// Fetches one JSON document per tick.
pub struct PollAdapter {
    core: AdapterCore,
    url: String,
    interval: Duration,
    client: reqwest::Client,
}

impl PollAdapter {
    pub fn new(
        ingest: Arc<StationIngest>,
        kind: RecordKind,
        url: String,
        interval: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            core: AdapterCore::new(ingest, kind),
            url,
            interval,
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One request, decoded and handed to the station pipeline.
    pub async fn tick(&self) -> Result<IngestOutcome, TransportError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }
        let body = response.bytes().await?;
        let payload = decode_object(&body)?;
        Ok(self.core.ingest.ingest(self.core.kind, payload))
    }

    async fn run(self: Arc<Self>, stop: CancellationToken) {
        let station = self.core.station_name();
        let kind = self.core.kind.as_str();
        info!(
            "[{}] Polling {} from {} every {}s",
            station,
            kind,
            self.url,
            self.interval.as_secs()
        );

        // A request in flight is allowed to finish; only the wait is cut short.
        while !stop.is_cancelled() {
            if let Err(e) = self.tick().await {
                warn!("[{}] {} poll failed: {}", station, kind, e);
                metrics::record_transport_error(station, kind, e.label());
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = stop.cancelled() => break,
            }
        }

        info!("[{}] {} poller stopped", station, kind);
    }
}

#[async_trait]
impl StationAdapter for PollAdapter {
    fn station(&self) -> StationId {
        self.core.station()
    }

    fn kind(&self) -> RecordKind {
        self.core.kind
    }

    fn strategy(&self) -> Strategy {
        Strategy::Poll
    }

    fn state(&self) -> AdapterState {
        self.core.lifecycle.state()
    }

    fn start(self: Arc<Self>) -> bool {
        let adapter = self.clone();
        self.core.lifecycle.start(move |stop| adapter.run(stop))
    }

    fn stop(&self) {
        self.core.lifecycle.stop();
    }

    async fn join(&self, grace: Duration) -> bool {
        self.core.lifecycle.join(grace).await
    }
}
