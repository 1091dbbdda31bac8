//! Validate, track, normalize, append.
//!
//! [`StationIngest`] is the part every transport shares: whatever delivered
//! the document (a poll tick, a stream frame, a webhook call) hands the
//! decoded object here and the station's profile decides what gets stored.

use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::buffer::BatchBuffer;
use super::record::{NormalizedRecord, RecordKind};
use super::session::SongSessionTracker;
use crate::clock::ZoneClock;
use crate::server::metrics;
use crate::stations::{display_value, StationProfile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Appended {
        raw_valid: bool,
        session_id: String,
        new_session: bool,
    },
    /// The station's policy does not record this payload.
    Skipped,
}

impl IngestOutcome {
    pub fn is_appended(&self) -> bool {
        matches!(self, IngestOutcome::Appended { .. })
    }
}

/// Per-station ingestion state: one session tracker shared by all of the
/// station's transports, and the two buffers the uploader drains.
#[derive(Debug)]
pub struct StationIngest {
    profile: Arc<StationProfile>,
    tracker: Mutex<SongSessionTracker>,
    songs: Arc<BatchBuffer>,
    listeners: Arc<BatchBuffer>,
    clock: ZoneClock,
}

impl StationIngest {
    pub fn new(profile: Arc<StationProfile>, clock: ZoneClock) -> Self {
        let tracker = SongSessionTracker::new(profile.session_rule.clone());
        Self {
            profile,
            tracker: Mutex::new(tracker),
            songs: Arc::new(BatchBuffer::new()),
            listeners: Arc::new(BatchBuffer::new()),
            clock,
        }
    }

    pub fn profile(&self) -> &StationProfile {
        &self.profile
    }

    pub fn station_name(&self) -> &'static str {
        self.profile.id.name()
    }

    pub fn buffer(&self, kind: RecordKind) -> &Arc<BatchBuffer> {
        match kind {
            RecordKind::Song => &self.songs,
            RecordKind::Listeners => &self.listeners,
        }
    }

    pub fn clock(&self) -> ZoneClock {
        self.clock
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.lock_tracker().current_session_id().map(str::to_string)
    }

    pub fn ingest(&self, kind: RecordKind, payload: Map<String, Value>) -> IngestOutcome {
        match kind {
            RecordKind::Song => self.ingest_song(payload),
            RecordKind::Listeners => self.ingest_listeners(payload),
        }
    }

    pub fn ingest_song(&self, payload: Map<String, Value>) -> IngestOutcome {
        let station = self.station_name();
        let valid = self.profile.song_schema.validate_object(&payload);

        let (new_session, session_id, summary) = {
            let mut tracker = self.lock_tracker();
            let new_session = valid && tracker.is_new_song(&payload);
            let summary = if new_session {
                let session = tracker.record(&payload);
                Some(
                    self.profile
                        .song_summary
                        .describe(&payload, session.fingerprint.as_ref()),
                )
            } else {
                None
            };
            let session_id = if valid {
                tracker.current_session_id().unwrap_or_default().to_string()
            } else {
                String::new()
            };
            (new_session, session_id, summary)
        };

        if new_session {
            metrics::record_session_started(station);
        }

        if !self.profile.song_policy.should_append(valid, new_session) {
            if valid {
                debug!("[{}] Same song still playing (session {})", station, session_id);
            } else {
                warn!("[{}] Dropped malformed song payload", station);
            }
            return IngestOutcome::Skipped;
        }

        self.append(RecordKind::Song, payload, valid, session_id.clone());

        match summary {
            Some(summary) => info!("[{}] New song (session {}): {}", station, session_id, summary),
            None if !valid => warn!("[{}] Recorded malformed song payload", station),
            None => debug!("[{}] Recorded song tick (session {})", station, session_id),
        }

        IngestOutcome::Appended {
            raw_valid: valid,
            session_id,
            new_session,
        }
    }

    /// Listener samples are always recorded, tagged with the session current
    /// at this instant.
    pub fn ingest_listeners(&self, payload: Map<String, Value>) -> IngestOutcome {
        let station = self.station_name();
        let valid = self.profile.listeners_schema.validate_object(&payload);
        let session_id = self.current_session_id().unwrap_or_default();
        let count = payload
            .get("listeners")
            .map(display_value)
            .unwrap_or_else(|| "N/A".to_string());

        self.append(RecordKind::Listeners, payload, valid, session_id.clone());

        if valid {
            info!("[{}] Listeners: {} (session {})", station, count, session_id);
        } else {
            warn!("[{}] Recorded malformed listeners payload", station);
        }

        IngestOutcome::Appended {
            raw_valid: valid,
            session_id,
            new_session: false,
        }
    }

    fn append(
        &self,
        kind: RecordKind,
        payload: Map<String, Value>,
        raw_valid: bool,
        song_session_id: String,
    ) {
        let record = NormalizedRecord {
            kind,
            payload: self.profile.projection(kind).apply(payload),
            recorded_at: self.clock.now(),
            raw_valid,
            song_session_id,
        };
        let buffer = self.buffer(kind);
        buffer.append(record);
        metrics::record_appended(self.station_name(), kind.as_str(), raw_valid, buffer.len());
    }

    fn lock_tracker(&self) -> MutexGuard<'_, SongSessionTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::StationId;
    use serde_json::json;

    fn ingest_for(id: StationId) -> StationIngest {
        StationIngest::new(Arc::new(id.profile()), ZoneClock::default())
    }

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {}", other),
        }
    }

    fn melody_song(title: &str) -> Map<String, Value> {
        obj(json!({
            "station": "Rádio Melody",
            "title": title,
            "artist": "Y",
            "date": "01.01.2025",
            "time": "10:00",
            "last_update": "10:00:05"
        }))
    }

    fn rock_song(title: &str) -> Map<String, Value> {
        obj(json!({
            "song": {
                "musicAuthor": "A",
                "musicTitle": title,
                "musicCover": "",
                "radio": "rock",
                "startTime": "s"
            },
            "last_update": "u"
        }))
    }

    #[test]
    fn test_on_change_records_only_transitions() {
        let melody = ingest_for(StationId::Melody);

        let first = melody.ingest_song(melody_song("X"));
        let repeat = melody.ingest_song(melody_song("X"));

        let IngestOutcome::Appended {
            raw_valid: true,
            session_id,
            new_session: true,
        } = first
        else {
            panic!("first song should open a session, got {:?}", first);
        };
        assert!(!session_id.is_empty());
        assert_eq!(repeat, IngestOutcome::Skipped);

        let songs = melody.buffer(RecordKind::Song).drain();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].song_session_id, session_id);
        assert!(songs[0].raw_valid);
    }

    #[test]
    fn test_invalid_song_recorded_for_audit() {
        let melody = ingest_for(StationId::Melody);
        melody.ingest_song(melody_song("X"));
        let outcome = melody.ingest_song(obj(json!({"title": "broken"})));

        assert_eq!(
            outcome,
            IngestOutcome::Appended {
                raw_valid: false,
                session_id: String::new(),
                new_session: false,
            }
        );
        let songs = melody.buffer(RecordKind::Song).drain();
        assert_eq!(songs.len(), 2);
        assert!(!songs[1].raw_valid);
        assert_eq!(songs[1].payload, obj(json!({"title": "broken"})));
    }

    #[test]
    fn test_on_change_only_drops_invalid_song() {
        let funradio = ingest_for(StationId::Funradio);
        assert_eq!(
            funradio.ingest_song(obj(json!({"song": null}))),
            IngestOutcome::Skipped
        );
        assert!(funradio.buffer(RecordKind::Song).is_empty());
    }

    #[test]
    fn test_every_tick_repeats_keep_session_and_project_song() {
        let rock = ingest_for(StationId::Rock);
        rock.ingest_song(rock_song("T"));
        rock.ingest_song(rock_song("T"));
        rock.ingest_song(obj(json!({"unexpected": true})));

        let songs = rock.buffer(RecordKind::Song).drain();
        assert_eq!(songs.len(), 3);
        assert_eq!(songs[0].song_session_id, songs[1].song_session_id);
        assert!(!songs[0].song_session_id.is_empty());
        assert_eq!(songs[0].payload["musicTitle"], json!("T"));
        assert!(!songs[0].payload.contains_key("last_update"));
        assert!(!songs[2].raw_valid);
        assert!(songs[2].song_session_id.is_empty());
        assert!(songs[2].payload.is_empty());
    }

    #[test]
    fn test_listeners_snapshot_current_session() {
        let melody = ingest_for(StationId::Melody);
        melody.ingest_listeners(obj(json!({"last_update": "t", "listeners": 1})));
        melody.ingest_song(melody_song("X"));
        let first_session = melody.current_session_id().unwrap();
        melody.ingest_listeners(obj(json!({"last_update": "t", "listeners": 2})));
        melody.ingest_song(melody_song("Z"));
        melody.ingest_listeners(obj(json!({"listeners": "many"})));

        let listeners = melody.buffer(RecordKind::Listeners).drain();
        assert_eq!(listeners.len(), 3);
        assert_eq!(listeners[0].song_session_id, "");
        assert_eq!(listeners[1].song_session_id, first_session);
        assert_ne!(listeners[2].song_session_id, first_session);
        assert!(!listeners[2].raw_valid);
    }

    #[test]
    fn test_rock_listeners_keep_only_count() {
        let rock = ingest_for(StationId::Rock);
        rock.ingest_listeners(obj(json!({"listeners": 8, "debug": "x"})));
        let listeners = rock.buffer(RecordKind::Listeners).drain();
        assert_eq!(listeners[0].payload, obj(json!({"listeners": 8})));
        assert!(!listeners[0].raw_valid);
    }

    #[test]
    fn test_pushed_songs_always_open_sessions() {
        let expres = ingest_for(StationId::Expres);
        let push = obj(json!({
            "song": "S",
            "artists": ["A"],
            "isrc": "I",
            "start_time": "t",
            "radio": "expres"
        }));
        expres.ingest_song(push.clone());
        expres.ingest_song(push);

        let songs = expres.buffer(RecordKind::Song).drain();
        assert_eq!(songs.len(), 2);
        assert_ne!(songs[0].song_session_id, songs[1].song_session_id);
    }
}
