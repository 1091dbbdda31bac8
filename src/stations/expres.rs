use crate::ingest::{PayloadSchema, Schema, SessionRule};

use super::{Projection, SongAppendPolicy, SongSummary, Source, StationId, StationProfile};

const LISTENERS_URL: &str = "http://147.232.205.56:5010/api/current_listeners";

pub(super) fn profile() -> StationProfile {
    StationProfile {
        id: StationId::Expres,
        song_schema: PayloadSchema::single(
            Schema::exact()
                .present("song")
                .list("artists")
                .present("isrc")
                .present("start_time")
                .equals("radio", "expres"),
        ),
        listeners_schema: PayloadSchema::single(
            Schema::exact()
                .present("timestamp")
                .integer("listeners")
                .equals("radio", "expres"),
        ),
        session_rule: SessionRule::PushedOnChange,
        song_policy: SongAppendPolicy::OnChangeOrInvalid,
        song_projection: Projection::Whole,
        listeners_projection: Projection::Whole,
        song_summary: SongSummary {
            root: None,
            fields: &["song", "artists", "start_time"],
        },
        song_source: Source::Webhook {
            paths: &["/expres_webhook"],
        },
        listeners_source: Source::Poll { url: LISTENERS_URL },
        stream_paced: false,
    }
}
