use crate::ingest::{PayloadSchema, Schema, SessionRule};

use super::{Projection, SongAppendPolicy, SongSummary, Source, StationId, StationProfile};

const SONG_URL: &str = "https://funradio-server.fly.dev/pull/playing";
const LISTENERS_URL: &str = "wss://funradio-server.fly.dev/ws/push/listenership";

/// Now-playing document served by the FUNRADIO and ROCK servers.
pub(super) fn song_schema() -> PayloadSchema {
    let song = Schema::exact()
        .present("musicAuthor")
        .present("musicTitle")
        .present("musicCover")
        .present("radio")
        .present("startTime");
    PayloadSchema::single(Schema::superset().object("song", song).present("last_update"))
}

pub(super) fn listeners_schema() -> PayloadSchema {
    PayloadSchema::single(Schema::exact().integer("listeners"))
}

pub(super) fn session_rule() -> SessionRule {
    SessionRule::TitleArtist {
        root: Some("song"),
        title: "musicTitle",
        artist: "musicAuthor",
    }
}

pub(super) fn song_summary() -> SongSummary {
    SongSummary {
        root: Some("song"),
        fields: &["musicTitle", "musicAuthor", "startTime"],
    }
}

pub(super) fn profile() -> StationProfile {
    StationProfile {
        id: StationId::Funradio,
        song_schema: song_schema(),
        listeners_schema: listeners_schema(),
        session_rule: session_rule(),
        song_policy: SongAppendPolicy::OnChange,
        song_projection: Projection::Whole,
        listeners_projection: Projection::Whole,
        song_summary: song_summary(),
        song_source: Source::Poll { url: SONG_URL },
        listeners_source: Source::Stream { url: LISTENERS_URL },
        stream_paced: true,
    }
}
