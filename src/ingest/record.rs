use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Keys appended to every stored payload.
pub const METADATA_KEYS: [&str; 3] = ["recorded_at", "raw_valid", "song_session_id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Song,
    Listeners,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::Song, RecordKind::Listeners];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Song => "song",
            RecordKind::Listeners => "listeners",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ingested sample, as buffered and uploaded.
///
/// The payload keeps the station's own field names. On serialization the
/// payload fields come first, followed by the metadata keys, in one flat
/// object; metadata wins over a payload key of the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub kind: RecordKind,
    pub payload: Map<String, Value>,
    pub recorded_at: DateTime<FixedOffset>,
    pub raw_valid: bool,
    /// Snapshot of the session current at append time, empty if none.
    pub song_session_id: String,
}

impl NormalizedRecord {
    pub fn recorded_at_iso(&self) -> String {
        self.recorded_at
            .to_rfc3339_opts(SecondsFormat::Micros, false)
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.payload {
            if !METADATA_KEYS.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry("recorded_at", &self.recorded_at_iso())?;
        map.serialize_entry("raw_valid", &self.raw_valid)?;
        map.serialize_entry("song_session_id", &self.song_session_id)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(payload: Value) -> NormalizedRecord {
        let Value::Object(payload) = payload else {
            panic!("payload must be an object");
        };
        NormalizedRecord {
            kind: RecordKind::Song,
            payload,
            recorded_at: FixedOffset::east_opt(3600)
                .unwrap()
                .with_ymd_and_hms(2025, 11, 4, 16, 16, 20)
                .unwrap(),
            raw_valid: true,
            song_session_id: "abc".to_string(),
        }
    }

    #[test]
    fn test_serializes_flat_with_metadata_last() {
        let text = serde_json::to_string(&record(json!({"title": "X", "artist": "Y"}))).unwrap();
        assert_eq!(
            text,
            r#"{"title":"X","artist":"Y","recorded_at":"2025-11-04T16:16:20.000000+01:00","raw_valid":true,"song_session_id":"abc"}"#
        );
    }

    #[test]
    fn test_metadata_overrides_payload_keys() {
        let value =
            serde_json::to_value(record(json!({"raw_valid": "spoofed", "title": "X"}))).unwrap();
        assert_eq!(value["raw_valid"], json!(true));
        assert_eq!(value.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_record_kind_names() {
        assert_eq!(RecordKind::Song.to_string(), "song");
        assert_eq!(RecordKind::Listeners.as_str(), "listeners");
        assert_eq!(serde_json::to_value(RecordKind::Listeners).unwrap(), json!("listeners"));
    }
}
