use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::decode_object;
use super::{AdapterCore, AdapterState, StationAdapter, Strategy, TransportError};
use crate::ingest::{IngestOutcome, RecordKind, StationIngest};
use crate::server::metrics;
use crate::stations::StationId;

/// Holds a WebSocket open and ingests every pushed frame. Reconnects
/// forever.
pub struct StreamAdapter {
    core: AdapterCore,
    url: String,
    /// Pause after each data frame; frames queue in the socket meanwhile.
    pacing: Option<Duration>,
    reconnect_delay: Duration,
}

impl StreamAdapter {
    pub fn new(
        ingest: Arc<StationIngest>,
        kind: RecordKind,
        url: String,
        pacing: Option<Duration>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            core: AdapterCore::new(ingest, kind),
            url,
            pacing,
            reconnect_delay,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Decode and ingest one frame. An undecodable frame is logged and
    /// dropped; the connection stays up.
    pub fn handle_frame(&self, data: &[u8]) -> Option<IngestOutcome> {
        match decode_object(data) {
            Ok(payload) => Some(self.core.ingest.ingest(self.core.kind, payload)),
            Err(e) => {
                let station = self.core.station_name();
                warn!("[{}] Dropping {} frame: {}", station, self.core.kind, e);
                metrics::record_transport_error(station, self.core.kind.as_str(), e.label());
                None
            }
        }
    }

    async fn run(self: Arc<Self>, stop: CancellationToken) {
        let station = self.core.station_name();
        info!(
            "[{}] Streaming {} from {} (reconnect_delay={}s)",
            station,
            self.core.kind,
            self.url,
            self.reconnect_delay.as_secs()
        );

        loop {
            tokio::select! {
                result = self.run_connection() => {
                    match result {
                        Ok(()) => info!(
                            "[{}] Stream closed, reconnecting in {}s",
                            station, self.reconnect_delay.as_secs()
                        ),
                        Err(e) => {
                            warn!(
                                "[{}] Stream error: {}, reconnecting in {}s",
                                station, e, self.reconnect_delay.as_secs()
                            );
                            metrics::record_transport_error(station, self.core.kind.as_str(), e.label());
                        }
                    }
                }
                _ = stop.cancelled() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = stop.cancelled() => break,
            }
        }

        info!("[{}] {} stream stopped", station, self.core.kind);
    }

    /// Runs until the server closes the connection or the socket fails.
    async fn run_connection(&self) -> Result<(), TransportError> {
        let station = self.core.station_name();
        let (ws_stream, _) = connect_async(self.url.as_str()).await?;
        info!("[{}] Connected to {}", station, self.url);

        let (mut write, mut read) = ws_stream.split();

        while let Some(message) = read.next().await {
            match message? {
                Message::Text(text) => {
                    self.handle_frame(text.as_bytes());
                    self.pace().await;
                }
                Message::Binary(data) => {
                    self.handle_frame(&data);
                    self.pace().await;
                }
                Message::Ping(data) => write.send(Message::Pong(data)).await?,
                Message::Close(frame) => {
                    debug!("[{}] Close frame: {:?}", station, frame);
                    break;
                }
                _ => {}
            }
        }

        Ok(())
    }

    async fn pace(&self) {
        if let Some(pacing) = self.pacing {
            tokio::time::sleep(pacing).await;
        }
    }
}

#[async_trait]
impl StationAdapter for StreamAdapter {
    fn station(&self) -> StationId {
        self.core.station()
    }

    fn kind(&self) -> RecordKind {
        self.core.kind
    }

    fn strategy(&self) -> Strategy {
        Strategy::Stream
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
