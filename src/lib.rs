//! Radio station now-playing and listener ingestion.
//!
//! Each station's upstream is polled, streamed or pushed to us; payloads are
//! validated against the station's schema, tagged with the current song
//! session, buffered, and periodically uploaded to an object store.

pub mod adapter;
pub mod clock;
pub mod config;
pub mod ingest;
pub mod server;
pub mod stations;
pub mod supervisor;
pub mod upload;

pub use clock::ZoneClock;
pub use ingest::{NormalizedRecord, RecordKind, StationIngest};
pub use server::RequestsLoggingLevel;
pub use stations::{StationId, StationProfile};
pub use supervisor::{StationRuntime, Supervisor};
pub use upload::{BatchSink, ObjectStoreSink, UploadScheduler};
