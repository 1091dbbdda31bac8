use chrono::{DateTime, FixedOffset, TimeZone};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::sink::{BatchSink, SinkError};
use crate::adapter::{AdapterState, Lifecycle};
use crate::clock::ZoneClock;
use crate::ingest::{BatchBuffer, RecordKind, StationIngest};
use crate::server::metrics;
use crate::stations::StationId;

/// `{tier}/{STATION}/{kind}/{dd-mm-YYYY}/{HH-MM-SS}.json`
pub fn upload_key<Tz: TimeZone>(
    tier: &str,
    station: StationId,
    kind: RecordKind,
    at: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}/{}/{}/{}/{}.json",
        tier,
        station.name(),
        kind,
        at.format("%d-%m-%Y"),
        at.format("%H-%M-%S")
    )
}

/// Attempts at a free key when two batches land in the same second.
const MAX_KEY_SUFFIX: usize = 9;

/// `.../HH-MM-SS.json` becomes `.../HH-MM-SS-{n}.json`.
fn suffixed_key(key: &str, n: usize) -> String {
    match key.strip_suffix(".json") {
        Some(stem) => format!("{}-{}.json", stem, n),
        None => format!("{}-{}", key, n),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchUpload {
    pub kind: RecordKind,
    pub key: String,
    pub records: usize,
    pub success: bool,
}

/// What one drain-and-upload cycle did. Empty drains produce no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub batches: Vec<BatchUpload>,
}

impl FlushReport {
    pub fn uploaded_records(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| b.success)
            .map(|b| b.records)
            .sum()
    }

    pub fn dropped_records(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| !b.success)
            .map(|b| b.records)
            .sum()
    }
}

/// Periodically drains a station's two buffers into the sink.
///
/// A failed upload is logged and its records are gone; nothing is put back
/// into the buffers.
pub struct UploadScheduler {
    station: StationId,
    songs: Arc<BatchBuffer>,
    listeners: Arc<BatchBuffer>,
    sink: Arc<dyn BatchSink>,
    interval: Duration,
    tier: String,
    clock: ZoneClock,
    lifecycle: Lifecycle,
}

impl UploadScheduler {
    pub fn new(
        ingest: &StationIngest,
        sink: Arc<dyn BatchSink>,
        interval: Duration,
        tier: String,
    ) -> Self {
        Self {
            station: ingest.profile().id,
            songs: ingest.buffer(RecordKind::Song).clone(),
            listeners: ingest.buffer(RecordKind::Listeners).clone(),
            sink,
            interval,
            tier,
            clock: ingest.clock(),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn flush(&self) -> FlushReport {
        self.flush_at(self.clock.now()).await
    }

    async fn flush_at(&self, now: DateTime<FixedOffset>) -> FlushReport {
        let mut report = FlushReport::default();

        for (kind, buffer) in [
            (RecordKind::Song, &self.songs),
            (RecordKind::Listeners, &self.listeners),
        ] {
            let station = self.station.name();
            let records = buffer.drain();
            metrics::set_buffered(station, kind.as_str(), buffer.len());
            if records.is_empty() {
                debug!("[{}] No {} records to upload", station, kind);
                continue;
            }

            let mut key = upload_key(&self.tier, self.station, kind, &now);
            let count = records.len();
            let result = match serde_json::to_vec_pretty(&records) {
                Ok(body) => match self.put_unique(&key, body).await {
                    Ok(stored_at) => {
                        key = stored_at;
                        Ok(())
                    }
                    Err(e) => Err(e.to_string()),
                },
                Err(e) => Err(e.to_string()),
            };

            let success = match result {
                Ok(()) => {
                    info!("[{}] Uploaded {} {} records to {}", station, count, kind, key);
                    true
                }
                Err(e) => {
                    error!(
                        "[{}] Upload of {} {} records to {} failed, batch dropped: {}",
                        station, count, kind, key, e
                    );
                    false
                }
            };
            metrics::record_upload(station, kind.as_str(), success, if success { 0 } else { count });

            report.batches.push(BatchUpload {
                kind,
                key,
                records: count,
                success,
            });
        }

        report
    }

    /// Put under `key`, or under the first free suffixed variant of it.
    /// Returns the key actually written.
    async fn put_unique(&self, key: &str, body: Vec<u8>) -> Result<String, SinkError> {
        let mut candidate = key.to_string();
        for n in 1..=MAX_KEY_SUFFIX {
            match self.sink.put(&candidate, body.clone()).await {
                Err(SinkError::AlreadyExists { .. }) => {
                    warn!("[{}] {} exists, trying another key", self.station.name(), candidate);
                    candidate = suffixed_key(key, n);
                }
                other => return other.map(|()| candidate),
            }
        }
        self.sink.put(&candidate, body).await.map(|()| candidate)
    }

    async fn run(self: Arc<Self>, stop: CancellationToken) {
        let station = self.station.name();
        info!(
            "[{}] Uploading to {} every {}s",
            station,
            self.sink.describe(),
            self.interval.as_secs()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush().await;
                }
                _ = stop.cancelled() => {
                    info!("[{}] Final upload before shutdown", station);
                    self.flush().await;
                    break;
                }
            }
        }

        info!("[{}] Upload scheduler stopped", station);
    }

    pub fn start(self: &Arc<Self>) -> bool {
        let scheduler = self.clone();
        self.lifecycle.start(move |stop| scheduler.run(stop))
    }

    /// Stopping triggers one last flush.
    pub fn stop(&self) {
        self.lifecycle.stop();
    }

    pub fn state(&self) -> AdapterState {
        self.lifecycle.state()
    }

    pub async fn join(&self, grace: Duration) -> bool {
        self.lifecycle.join(grace).await
    }
}
