use crate::ingest::{PayloadSchema, Schema, SessionRule};

use super::{Projection, SongAppendPolicy, SongSummary, Source, StationId, StationProfile};

const SONG_URL: &str =
    "https://radio-beta-generator-stable-czarcpe4f0bee5h7.polandcentral-01.azurewebsites.net/now-playing";
const LISTENERS_URL: &str =
    "wss://radio-beta-generator-stable-czarcpe4f0bee5h7.polandcentral-01.azurewebsites.net/listeners";

fn playing_shape() -> Schema {
    Schema::superset()
        .equals("radio", "Beta")
        .string("interpreters")
        .string("title")
        .string("start_time")
        .string("timestamp")
}

fn silence_shape() -> Schema {
    Schema::superset()
        .equals("radio", "Beta")
        .equals("is_playing", false)
        .string("message")
        .string("timestamp")
}

pub(super) fn profile() -> StationProfile {
    StationProfile {
        id: StationId::Beta,
        song_schema: PayloadSchema::one_of(vec![playing_shape(), silence_shape()]),
        listeners_schema: PayloadSchema::single(
            Schema::superset().integer("listeners").string("timestamp"),
        ),
        session_rule: SessionRule::TitleArtistOrSilence {
            title: "title",
            artist: "interpreters",
            playing: "is_playing",
            message: "message",
        },
        song_policy: SongAppendPolicy::OnChangeOrInvalid,
        song_projection: Projection::Whole,
        listeners_projection: Projection::Whole,
        song_summary: SongSummary {
            root: None,
            fields: &["title", "interpreters", "start_time"],
        },
        song_source: Source::Poll { url: SONG_URL },
        listeners_source: Source::Stream { url: LISTENERS_URL },
        stream_paced: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::RecordKind;
    use serde_json::json;

    #[test]
    fn test_playing_and_silence_shapes() {
        let beta = profile();
        let playing = json!({
            "radio": "Beta",
            "interpreters": "Artist",
            "title": "Song",
            "start_time": "12:00:00",
            "timestamp": "2025-01-01T12:00:00",
            "extra": 1
        });
        let silence = json!({
            "radio": "Beta",
            "is_playing": false,
            "message": "Off air",
            "timestamp": "2025-01-01T12:00:00"
        });
        assert!(beta.validate(&playing, RecordKind::Song));
        assert!(beta.validate(&silence, RecordKind::Song));
    }

    #[test]
    fn test_rejects_wrong_station_and_playing_flag() {
        let beta = profile();
        let other_radio = json!({
            "radio": "Alpha",
            "interpreters": "Artist",
            "title": "Song",
            "start_time": "12:00:00",
            "timestamp": "t"
        });
        let still_playing = json!({
            "radio": "Beta",
            "is_playing": true,
            "message": "Off air",
            "timestamp": "t"
        });
        assert!(!beta.validate(&other_radio, RecordKind::Song));
        assert!(!beta.validate(&still_playing, RecordKind::Song));
    }

    #[test]
    fn test_listeners_superset() {
        let beta = profile();
        assert!(beta.validate(
            &json!({"listeners": 12, "timestamp": "t", "extra": true}),
            RecordKind::Listeners
        ));
        assert!(!beta.validate(&json!({"listeners": "12", "timestamp": "t"}), RecordKind::Listeners));
        assert!(!beta.validate(&json!({"listeners": 12}), RecordKind::Listeners));
    }

    #[test]
    fn test_playing_keys_decide_even_with_silence_keys() {
        let beta = profile();
        let bad_title = json!({
            "radio": "Beta",
            "interpreters": "A",
            "title": 42,
            "start_time": "s",
            "timestamp": "t",
            "is_playing": false,
            "message": "m"
        });
        assert!(!beta.validate(&bad_title, RecordKind::Song));

        let ingest = crate::ingest::StationIngest::new(
            std::sync::Arc::new(beta),
            crate::clock::ZoneClock::default(),
        );
        let outcome = ingest.ingest_song(bad_title.as_object().unwrap().clone());
        assert_eq!(
            outcome,
            crate::ingest::IngestOutcome::Appended {
                raw_valid: false,
                session_id: String::new(),
                new_session: false,
            }
        );
        assert!(ingest.current_session_id().is_none());
    }
}
