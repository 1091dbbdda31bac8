//! Payload fixtures matching the built-in station schemas.

#![allow(dead_code)]

use radio_ingest::clock::ZoneClock;
use radio_ingest::{StationId, StationIngest};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub fn ingest_for(station: StationId) -> Arc<StationIngest> {
    Arc::new(StationIngest::new(
        Arc::new(station.profile()),
        ZoneClock::default(),
    ))
}

pub fn as_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be an object, got {}", other),
    }
}

pub fn melody_song(title: &str, artist: &str) -> Value {
    json!({
        "station": "Rádio Melody",
        "title": title,
        "artist": artist,
        "date": "04.11.2025",
        "time": "16:16",
        "last_update": "16:16:20"
    })
}

pub fn melody_listeners(count: i64) -> Value {
    json!({"last_update": "16:16:20", "listeners": count})
}

pub fn rock_song(title: &str) -> Value {
    json!({
        "song": {
            "musicAuthor": "Band",
            "musicTitle": title,
            "musicCover": "https://example.invalid/cover.jpg",
            "radio": "rock",
            "startTime": "2025-11-04T16:16:20"
        },
        "last_update": "2025-11-04T16:16:25"
    })
}

pub fn expres_song(title: &str) -> Value {
    json!({
        "song": title,
        "artists": ["Artist One", "Artist Two"],
        "isrc": "SKA012500001",
        "start_time": "2025-11-04T16:16:20",
        "radio": "expres"
    })
}

pub fn jazz_listeners(count: i64) -> Value {
    json!({"timestamp": "2025-11-04T16:16:20", "listeners": count, "radio": "jazz"})
}
