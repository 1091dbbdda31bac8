//! One [`StationRuntime`] per enabled station, and the [`Supervisor`] that
//! starts them together and shuts them down in order.

use axum::Router;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapter::{
    AdapterState, PollAdapter, StationAdapter, StreamAdapter, Strategy, WebhookAdapter,
};
use crate::clock::ZoneClock;
use crate::config::{AppConfig, StationSettings, TransportSettings};
use crate::ingest::{RecordKind, StationIngest};
use crate::stations::StationId;
use crate::upload::{BatchSink, UploadScheduler};

#[derive(Debug, Clone, Serialize)]
pub struct AdapterStatus {
    pub strategy: Strategy,
    pub state: AdapterState,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationStatus {
    pub station: StationId,
    pub song: AdapterStatus,
    pub listeners: AdapterStatus,
    pub uploader: AdapterState,
    pub buffered_songs: usize,
    pub buffered_listeners: usize,
    pub song_session_id: Option<String>,
}

/// Everything one station runs: two adapters sharing one pipeline, and the
/// scheduler draining that pipeline's buffers.
pub struct StationRuntime {
    ingest: Arc<StationIngest>,
    song: Arc<dyn StationAdapter>,
    listeners: Arc<dyn StationAdapter>,
    webhooks: Vec<Arc<WebhookAdapter>>,
    uploader: Arc<UploadScheduler>,
}

impl StationRuntime {
    pub fn build(
        settings: &StationSettings,
        sink: Arc<dyn BatchSink>,
        client: reqwest::Client,
        clock: ZoneClock,
        tier: &str,
    ) -> Self {
        let profile = Arc::new(settings.station.profile());
        let ingest = Arc::new(StationIngest::new(profile, clock));

        let mut webhooks = Vec::new();
        let song = build_adapter(&ingest, RecordKind::Song, &settings.song, &client, &mut webhooks);
        let listeners = build_adapter(
            &ingest,
            RecordKind::Listeners,
            &settings.listeners,
            &client,
            &mut webhooks,
        );

        let uploader = Arc::new(UploadScheduler::new(
            &ingest,
            sink,
            settings.upload_interval,
            tier.to_string(),
        ));

        Self {
            ingest,
            song,
            listeners,
            webhooks,
            uploader,
        }
    }

    pub fn station(&self) -> StationId {
        self.ingest.profile().id
    }

    pub fn ingest(&self) -> &Arc<StationIngest> {
        &self.ingest
    }

    pub fn adapter(&self, kind: RecordKind) -> &Arc<dyn StationAdapter> {
        match kind {
            RecordKind::Song => &self.song,
            RecordKind::Listeners => &self.listeners,
        }
    }

    pub fn uploader(&self) -> &Arc<UploadScheduler> {
        &self.uploader
    }

    /// Start both adapters and the uploader. Already running parts are left
    /// alone.
    pub fn start(&self) {
        for adapter in [&self.song, &self.listeners] {
            if !adapter.clone().start() {
                warn!(
                    "[{}] {} adapter already running",
                    self.station(),
                    adapter.kind()
                );
            }
        }
        self.uploader.start();
    }

    pub fn stop_adapters(&self) {
        self.song.stop();
        self.listeners.stop();
    }

    pub fn stop(&self) {
        self.stop_adapters();
        self.uploader.stop();
    }

    /// Wait for the adapters, then for the uploader. `false` if anything had
    /// to be abandoned.
    pub async fn join(&self, grace: Duration) -> bool {
        let song = self.song.join(grace).await;
        let listeners = self.listeners.join(grace).await;
        let uploader = self.uploader.join(grace).await;
        song && listeners && uploader
    }

    pub fn webhook_router(&self) -> Router {
        self.webhooks
            .iter()
            .fold(Router::new(), |router, webhook| router.merge(webhook.routes()))
    }

    pub fn status(&self) -> StationStatus {
        let adapter_status = |adapter: &Arc<dyn StationAdapter>| AdapterStatus {
            strategy: adapter.strategy(),
            state: adapter.state(),
        };
        StationStatus {
            station: self.station(),
            song: adapter_status(&self.song),
            listeners: adapter_status(&self.listeners),
            uploader: self.uploader.state(),
            buffered_songs: self.ingest.buffer(RecordKind::Song).len(),
            buffered_listeners: self.ingest.buffer(RecordKind::Listeners).len(),
            song_session_id: self.ingest.current_session_id(),
        }
    }
}

fn build_adapter(
    ingest: &Arc<StationIngest>,
    kind: RecordKind,
    transport: &TransportSettings,
    client: &reqwest::Client,
    webhooks: &mut Vec<Arc<WebhookAdapter>>,
) -> Arc<dyn StationAdapter> {
    match transport {
        TransportSettings::Poll { url, interval } => Arc::new(PollAdapter::new(
            ingest.clone(),
            kind,
            url.clone(),
            *interval,
            client.clone(),
        )),
        TransportSettings::Stream {
            url,
            pacing,
            reconnect_delay,
        } => Arc::new(StreamAdapter::new(
            ingest.clone(),
            kind,
            url.clone(),
            *pacing,
            *reconnect_delay,
        )),
        TransportSettings::Webhook { paths } => {
            let webhook = Arc::new(WebhookAdapter::new(ingest.clone(), kind, paths.clone()));
            webhooks.push(webhook.clone());
            webhook
        }
    }
}

pub struct Supervisor {
    runtimes: Vec<StationRuntime>,
}

impl Supervisor {
    pub fn new(config: &AppConfig, sink: Arc<dyn BatchSink>, client: reqwest::Client) -> Self {
        let clock = ZoneClock::new(config.timezone);
        let runtimes = config
            .stations
            .iter()
            .map(|settings| {
                StationRuntime::build(settings, sink.clone(), client.clone(), clock, &config.tier)
            })
            .collect();
        Self::from_runtimes(runtimes)
    }

    pub fn from_runtimes(runtimes: Vec<StationRuntime>) -> Self {
        Self { runtimes }
    }

    pub fn runtimes(&self) -> &[StationRuntime] {
        &self.runtimes
    }

    pub fn runtime(&self, station: StationId) -> Option<&StationRuntime> {
        self.runtimes.iter().find(|r| r.station() == station)
    }

    pub fn start_all(&self) {
        for runtime in &self.runtimes {
            info!("[{}] Starting", runtime.station());
            runtime.start();
        }
    }

    /// Routes of every webhook adapter, ready to be merged into the server.
    pub fn webhook_router(&self) -> Router {
        self.runtimes
            .iter()
            .fold(Router::new(), |router, runtime| router.merge(runtime.webhook_router()))
    }

    pub fn statuses(&self) -> Vec<StationStatus> {
        self.runtimes.iter().map(StationRuntime::status).collect()
    }

    /// Stop ingesting, let the loops finish, then run every uploader's final
    /// flush. Returns `false` if some task had to be abandoned.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        info!("Stopping {} stations", self.runtimes.len());
        for runtime in &self.runtimes {
            runtime.stop_adapters();
        }
        let adapters_joined = join_all(self.runtimes.iter().flat_map(|runtime| {
            [
                runtime.song.join(grace),
                runtime.listeners.join(grace),
            ]
        }))
        .await;

        for runtime in &self.runtimes {
            runtime.uploader.stop();
        }
        let uploaders_joined =
            join_all(self.runtimes.iter().map(|runtime| runtime.uploader.join(grace))).await;

        let clean = adapters_joined
            .into_iter()
            .chain(uploaders_joined)
            .all(|joined| joined);
        if clean {
            info!("All stations stopped");
        } else {
            warn!("Some station tasks did not stop within {:?}", grace);
        }
        clean
    }
}
