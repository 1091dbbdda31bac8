use super::{funradio, Projection, SongAppendPolicy, Source, StationId, StationProfile};

const SONG_URL: &str = "https://rock-server.fly.dev/pull/playing";
const LISTENERS_URL: &str = "wss://rock-server.fly.dev/ws/push/listenership";

// Same server software as FUNRADIO; only the recording rules differ.
pub(super) fn profile() -> StationProfile {
    StationProfile {
        id: StationId::Rock,
        song_schema: funradio::song_schema(),
        listeners_schema: funradio::listeners_schema(),
        session_rule: funradio::session_rule(),
        song_policy: SongAppendPolicy::EveryTick,
        song_projection: Projection::Nested("song"),
        listeners_projection: Projection::Pick(&["listeners"]),
        song_summary: funradio::song_summary(),
        song_source: Source::Poll { url: SONG_URL },
        listeners_source: Source::Stream { url: LISTENERS_URL },
        stream_paced: false,
    }
}
