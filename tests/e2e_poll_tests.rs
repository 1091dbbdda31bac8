//! End-to-end tests for the polling transport against a fake station.

mod common;

use axum::http::StatusCode;
use common::*;
use radio_ingest::adapter::{AdapterState, PollAdapter, StationAdapter, TransportError};
use radio_ingest::{RecordKind, StationId};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn poller(station: &FakeStation, id: StationId, interval: Duration) -> Arc<PollAdapter> {
    Arc::new(PollAdapter::new(
        ingest_for(id),
        RecordKind::Song,
        station.song_url(),
        interval,
        reqwest::Client::new(),
    ))
}

#[tokio::test]
async fn test_melody_records_changes_and_invalid_payloads() {
    let station = FakeStation::spawn(FakeStationConfig::default()).await;
    station.push_song_json(&melody_song("X", "Y"));
    station.push_song_json(&melody_song("X", "Y"));
    station.push_song_json(&json!({"title": "X"}));
    station.push_song_json(&melody_song("Z", "Y"));

    let ingest = ingest_for(StationId::Melody);
    let adapter = PollAdapter::new(
        ingest.clone(),
        RecordKind::Song,
        station.song_url(),
        Duration::from_secs(30),
        reqwest::Client::new(),
    );
    for _ in 0..4 {
        adapter.tick().await.unwrap();
    }

    let records = ingest.buffer(RecordKind::Song).snapshot();
    let summary: Vec<_> = records
        .iter()
        .map(|r| (r.payload.get("title").cloned(), r.raw_valid))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Some(json!("X")), true),
            (Some(json!("X")), false),
            (Some(json!("Z")), true),
        ]
    );
    assert!(records[1].song_session_id.is_empty());
    assert_ne!(records[0].song_session_id, records[2].song_session_id);
    assert_eq!(
        ingest.current_session_id().as_deref(),
        Some(records[2].song_session_id.as_str())
    );
}

#[tokio::test]
async fn test_rock_records_every_tick_with_one_session() {
    let station = FakeStation::spawn(FakeStationConfig::default()).await;
    station.push_song_json(&rock_song("Anthem"));

    let ingest = ingest_for(StationId::Rock);
    let adapter = PollAdapter::new(
        ingest.clone(),
        RecordKind::Song,
        station.song_url(),
        Duration::from_secs(30),
        reqwest::Client::new(),
    );
    for _ in 0..3 {
        let outcome = adapter.tick().await.unwrap();
        assert!(outcome.is_appended());
    }

    let records = ingest.buffer(RecordKind::Song).snapshot();
    assert_eq!(records.len(), 3);
    assert!(records
        .iter()
        .all(|r| r.song_session_id == records[0].song_session_id));
    // Only the nested song object is kept.
    assert_eq!(records[0].payload.get("musicTitle"), Some(&json!("Anthem")));
    assert!(!records[0].payload.contains_key("last_update"));
}

#[tokio::test]
async fn test_http_error_status_is_reported() {
    let station = FakeStation::spawn(FakeStationConfig::default()).await;
    station.push_song(StatusCode::INTERNAL_SERVER_ERROR, "boom");

    let adapter = poller(&station, StationId::Melody, Duration::from_secs(30));
    match adapter.tick().await {
        Err(TransportError::Status(status)) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR)
        }
        other => panic!("expected a status error, got {:?}", other.map(|o| o.is_appended())),
    }
}

#[tokio::test]
async fn test_undecodable_bodies_produce_no_record() {
    let station = FakeStation::spawn(FakeStationConfig::default()).await;
    station.push_song(StatusCode::OK, "<html>not json</html>");
    station.push_song(StatusCode::OK, "[1, 2, 3]");

    let ingest = ingest_for(StationId::Melody);
    let adapter = PollAdapter::new(
        ingest.clone(),
        RecordKind::Song,
        station.song_url(),
        Duration::from_secs(30),
        reqwest::Client::new(),
    );

    assert!(matches!(adapter.tick().await, Err(TransportError::Decode(_))));
    assert!(matches!(adapter.tick().await, Err(TransportError::NotAnObject)));
    assert!(ingest.buffer(RecordKind::Song).is_empty());
}

#[tokio::test]
async fn test_poll_loop_keeps_going_after_failures() {
    let station = FakeStation::spawn(FakeStationConfig::default()).await;
    station.push_song(StatusCode::SERVICE_UNAVAILABLE, "later");
    station.push_song_json(&melody_song("X", "Y"));

    let adapter = poller(&station, StationId::Melody, Duration::from_millis(20));
    assert!(adapter.clone().start());
    wait_until("three polls", || station.song_requests() >= 3).await;

    adapter.stop();
    assert!(adapter.join(Duration::from_secs(2)).await);
    assert_eq!(adapter.state(), AdapterState::Stopped);
}

#[tokio::test]
async fn test_start_is_idempotent_and_stop_halts_polling() {
    let station = FakeStation::spawn(FakeStationConfig::default()).await;
    station.push_song_json(&melody_song("X", "Y"));

    let adapter = poller(&station, StationId::Melody, Duration::from_millis(20));
    assert!(adapter.clone().start());
    assert!(!adapter.clone().start());
    assert_eq!(adapter.state(), AdapterState::Running);

    wait_until("first poll", || station.song_requests() >= 1).await;
    adapter.stop();
    assert!(adapter.join(Duration::from_secs(2)).await);

    let after_stop = station.song_requests();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(station.song_requests(), after_stop);
}
