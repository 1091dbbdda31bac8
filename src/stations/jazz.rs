use crate::ingest::{PayloadSchema, Schema, SessionRule};

use super::{Projection, SongAppendPolicy, SongSummary, Source, StationId, StationProfile};

const SONG_URL: &str = "http://147.232.40.154:8000/current";

pub(super) fn profile() -> StationProfile {
    let song = Schema::exact()
        .present("play_date")
        .present("play_time")
        .list("artist")
        .present("title");

    StationProfile {
        id: StationId::Jazz,
        song_schema: PayloadSchema::single(Schema::superset().object("song", song)),
        listeners_schema: PayloadSchema::single(
            Schema::exact()
                .present("timestamp")
                .integer("listeners")
                .equals("radio", "jazz"),
        ),
        session_rule: SessionRule::TitleArtist {
            root: Some("song"),
            title: "title",
            artist: "artist",
        },
        song_policy: SongAppendPolicy::OnChange,
        song_projection: Projection::Whole,
        listeners_projection: Projection::Whole,
        song_summary: SongSummary {
            root: Some("song"),
            fields: &["title", "artist", "play_time"],
        },
        song_source: Source::Poll { url: SONG_URL },
        listeners_source: Source::Webhook {
            paths: &["/callback", "/callback-jazz"],
        },
        stream_paced: false,
    }
}
