//! Built-in station profiles.
//!
//! A profile is pure data: the schemas a station's payloads must match, how
//! "the current song" is fingerprinted, which song payloads get recorded,
//! what part of a payload is kept, and which transport the upstream speaks.

mod beta;
mod expres;
mod funradio;
mod jazz;
mod melody;
mod rock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::ingest::{Fingerprint, PayloadSchema, RecordKind, SessionRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationId {
    Beta,
    Funradio,
    Rock,
    Melody,
    Expres,
    Jazz,
}

impl StationId {
    pub const ALL: [StationId; 6] = [
        StationId::Beta,
        StationId::Funradio,
        StationId::Rock,
        StationId::Melody,
        StationId::Expres,
        StationId::Jazz,
    ];

    /// Upper-case name used in upload keys and log lines.
    pub fn name(&self) -> &'static str {
        match self {
            StationId::Beta => "BETA",
            StationId::Funradio => "FUNRADIO",
            StationId::Rock => "ROCK",
            StationId::Melody => "MELODY",
            StationId::Expres => "EXPRES",
            StationId::Jazz => "JAZZ",
        }
    }

    /// Lower-case name used in configuration.
    pub fn key(&self) -> &'static str {
        match self {
            StationId::Beta => "beta",
            StationId::Funradio => "funradio",
            StationId::Rock => "rock",
            StationId::Melody => "melody",
            StationId::Expres => "expres",
            StationId::Jazz => "jazz",
        }
    }

    pub fn profile(&self) -> StationProfile {
        match self {
            StationId::Beta => beta::profile(),
            StationId::Funradio => funradio::profile(),
            StationId::Rock => rock::profile(),
            StationId::Melody => melody::profile(),
            StationId::Expres => expres::profile(),
            StationId::Jazz => jazz::profile(),
        }
    }
}

impl std::fmt::Display for StationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StationId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        StationId::ALL
            .into_iter()
            .find(|id| id.key().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                let known: Vec<_> = StationId::ALL.iter().map(|id| id.key()).collect();
                format!("unknown station '{}'; expected one of {}", value, known.join(", "))
            })
    }
}

/// Which song payloads end up in the song buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongAppendPolicy {
    /// Valid payloads that open a new session. Malformed ones are dropped.
    OnChange,
    /// Valid payloads that open a new session, plus every malformed one.
    OnChangeOrInvalid,
    /// Every decoded payload, repeats included.
    EveryTick,
}

impl SongAppendPolicy {
    pub fn should_append(&self, valid: bool, new_session: bool) -> bool {
        match self {
            SongAppendPolicy::OnChange => valid && new_session,
            SongAppendPolicy::OnChangeOrInvalid => !valid || new_session,
            SongAppendPolicy::EveryTick => true,
        }
    }
}

/// The part of a decoded document stored as a record's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Whole,
    /// The object under one key; empty when absent or not an object.
    Nested(&'static str),
    /// Only the listed keys, `null` when absent.
    Pick(&'static [&'static str]),
}

impl Projection {
    pub fn apply(&self, mut payload: Map<String, Value>) -> Map<String, Value> {
        match self {
            Projection::Whole => payload,
            Projection::Nested(key) => match payload.remove(*key) {
                Some(Value::Object(inner)) => inner,
                _ => Map::new(),
            },
            Projection::Pick(keys) => keys
                .iter()
                .map(|key| {
                    let value = payload.remove(*key).unwrap_or(Value::Null);
                    (key.to_string(), value)
                })
                .collect(),
        }
    }
}

/// Fields printed in a "new song" status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SongSummary {
    pub root: Option<&'static str>,
    pub fields: &'static [&'static str],
}

impl SongSummary {
    pub fn describe(
        &self,
        payload: &Map<String, Value>,
        fingerprint: Option<&Fingerprint>,
    ) -> String {
        if let Some(Fingerprint::Silence { message }) = fingerprint {
            return format!("Nothing playing: {}", display_value(message));
        }

        let song = match self.root {
            Some(key) => payload.get(key).and_then(Value::as_object),
            None => Some(payload),
        };

        self.fields
            .iter()
            .map(|field| {
                song.and_then(|s| s.get(*field))
                    .map(display_value)
                    .unwrap_or_else(|| "N/A".to_string())
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Human-readable rendering of a payload value for log lines.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "N/A".to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Transport the upstream speaks for one record kind, with its default endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Poll { url: &'static str },
    Stream { url: &'static str },
    Webhook { paths: &'static [&'static str] },
}

#[derive(Debug, Clone)]
pub struct StationProfile {
    pub id: StationId,
    pub song_schema: PayloadSchema,
    pub listeners_schema: PayloadSchema,
    pub session_rule: SessionRule,
    pub song_policy: SongAppendPolicy,
    pub song_projection: Projection,
    pub listeners_projection: Projection,
    pub song_summary: SongSummary,
    pub song_source: Source,
    pub listeners_source: Source,
    /// Pause for the listener interval after each streamed frame.
    pub stream_paced: bool,
}

impl StationProfile {
    pub fn schema(&self, kind: RecordKind) -> &PayloadSchema {
        match kind {
            RecordKind::Song => &self.song_schema,
            RecordKind::Listeners => &self.listeners_schema,
        }
    }

    pub fn projection(&self, kind: RecordKind) -> Projection {
        match kind {
            RecordKind::Song => self.song_projection,
            RecordKind::Listeners => self.listeners_projection,
        }
    }

    pub fn source(&self, kind: RecordKind) -> Source {
        match kind {
            RecordKind::Song => self.song_source,
            RecordKind::Listeners => self.listeners_source,
        }
    }

    pub fn validate(&self, payload: &Value, kind: RecordKind) -> bool {
        self.schema(kind).validate(payload)
    }
}
