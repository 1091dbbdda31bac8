use crate::ingest::{PayloadSchema, Schema, SessionRule};

use super::{Projection, SongAppendPolicy, SongSummary, Source, StationId, StationProfile};

const SONG_URL: &str = "https://radio-melody-api.fly.dev/song";
const LISTENERS_URL: &str = "wss://radio-melody-api.fly.dev/ws/listeners";

pub(super) fn profile() -> StationProfile {
    StationProfile {
        id: StationId::Melody,
        song_schema: PayloadSchema::single(
            Schema::exact()
                .equals("station", "Rádio Melody")
                .string("title")
                .string("artist")
                .string("date")
                .string("time")
                .string("last_update"),
        ),
        listeners_schema: PayloadSchema::single(
            Schema::exact().string("last_update").integer("listeners"),
        ),
        session_rule: SessionRule::TitleArtist {
            root: None,
            title: "title",
            artist: "artist",
        },
        song_policy: SongAppendPolicy::OnChangeOrInvalid,
        song_projection: Projection::Whole,
        listeners_projection: Projection::Whole,
        song_summary: SongSummary {
            root: None,
            fields: &["title", "artist", "time"],
        },
        song_source: Source::Poll { url: SONG_URL },
        listeners_source: Source::Stream { url: LISTENERS_URL },
        stream_paced: true,
    }
}
