//! Song session tracking.
//!
//! A session is the span during which one song (or one silence state) is
//! current for a station. The tracker keeps the fingerprint of the current
//! session and mints a fresh id whenever a payload's fingerprint differs.

use serde_json::{Map, Value};
use uuid::Uuid;

/// Station-specific identity of "what is playing right now".
#[derive(Debug, Clone, PartialEq)]
pub enum Fingerprint {
    Track { title: Value, artist: Value },
    Silence { message: Value },
}

/// How a station's song payloads map to a [`Fingerprint`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionRule {
    /// Compare a title/artist pair, optionally nested under `root`.
    TitleArtist {
        root: Option<&'static str>,
        title: &'static str,
        artist: &'static str,
    },
    /// Title/artist pair when playing; a distinct silence state when the
    /// `playing` flag is literally `false`.
    TitleArtistOrSilence {
        title: &'static str,
        artist: &'static str,
        playing: &'static str,
        message: &'static str,
    },
    /// The upstream only pushes on change, so every payload is a new session.
    PushedOnChange,
}

impl SessionRule {
    pub fn fingerprint(&self, payload: &Map<String, Value>) -> Option<Fingerprint> {
        match self {
            SessionRule::TitleArtist {
                root,
                title,
                artist,
            } => {
                let song = match root {
                    Some(key) => payload.get(*key)?.as_object()?,
                    None => payload,
                };
                Some(Fingerprint::Track {
                    title: song.get(*title).cloned().unwrap_or(Value::Null),
                    artist: song.get(*artist).cloned().unwrap_or(Value::Null),
                })
            }
            SessionRule::TitleArtistOrSilence {
                title,
                artist,
                playing,
                message,
            } => {
                if let (Some(title), Some(artist)) = (payload.get(*title), payload.get(*artist)) {
                    Some(Fingerprint::Track {
                        title: title.clone(),
                        artist: artist.clone(),
                    })
                } else if payload.get(*playing) == Some(&Value::Bool(false)) {
                    Some(Fingerprint::Silence {
                        message: payload.get(*message).cloned().unwrap_or(Value::Null),
                    })
                } else {
                    None
                }
            }
            SessionRule::PushedOnChange => None,
        }
    }
}

/// The session currently considered playing.
#[derive(Debug, Clone, PartialEq)]
pub struct SongSession {
    pub session_id: String,
    pub fingerprint: Option<Fingerprint>,
    /// Owned copy of the payload that opened the session.
    pub payload: Map<String, Value>,
}

#[derive(Debug)]
pub struct SongSessionTracker {
    rule: SessionRule,
    current: Option<SongSession>,
}

impl SongSessionTracker {
    pub fn new(rule: SessionRule) -> Self {
        Self {
            rule,
            current: None,
        }
    }

    /// Whether `payload` starts a new session. Does not touch state.
    pub fn is_new_song(&self, payload: &Map<String, Value>) -> bool {
        if self.rule == SessionRule::PushedOnChange {
            return true;
        }

        let Some(fingerprint) = self.rule.fingerprint(payload) else {
            return false;
        };

        match &self.current {
            Some(session) => session.fingerprint.as_ref() != Some(&fingerprint),
            None => true,
        }
    }

    /// Open a new session for `payload` and return its id.
    pub fn record(&mut self, payload: &Map<String, Value>) -> &SongSession {
        self.current.insert(SongSession {
            session_id: Uuid::new_v4().to_string(),
            fingerprint: self.rule.fingerprint(payload),
            payload: payload.clone(),
        })
    }

    /// Record `payload` if it is a transition; returns the new session id.
    pub fn observe(&mut self, payload: &Map<String, Value>) -> Option<String> {
        if self.is_new_song(payload) {
            Some(self.record(payload).session_id.clone())
        } else {
            None
        }
    }

    pub fn current(&self) -> Option<&SongSession> {
        self.current.as_ref()
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.session_id.as_str())
    }
}
