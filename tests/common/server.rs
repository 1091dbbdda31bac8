//! Fake upstream station.
//!
//! Serves a now-playing document at `/song` from a queue of canned
//! responses, and pushes a fixed list of text frames to every WebSocket
//! client of `/ws`.

#![allow(dead_code)]

use super::constants::*;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Default, Clone)]
pub struct FakeStationConfig {
    /// Frames sent to each WebSocket client right after it connects.
    pub frames: Vec<String>,
    /// Close the socket once the frames are sent, instead of holding it open.
    pub close_after_frames: bool,
}

#[derive(Default)]
struct FakeState {
    songs: Mutex<VecDeque<(StatusCode, String)>>,
    last_song: Mutex<Option<(StatusCode, String)>>,
    song_requests: AtomicUsize,
    ws_connections: AtomicUsize,
    config: FakeStationConfig,
}

pub struct FakeStation {
    pub base_url: String,
    pub port: u16,
    state: Arc<FakeState>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

async fn song(State(state): State<Arc<FakeState>>) -> Response {
    state.song_requests.fetch_add(1, Ordering::SeqCst);
    let next = state.songs.lock().unwrap().pop_front();
    let response = match next {
        Some(response) => {
            *state.last_song.lock().unwrap() = Some(response.clone());
            Some(response)
        }
        // Keep serving the last document once the queue runs dry.
        None => state.last_song.lock().unwrap().clone(),
    };
    match response {
        Some((status, body)) => (status, body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn ws(State(state): State<Arc<FakeState>>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| push_frames(state, socket))
}

async fn push_frames(state: Arc<FakeState>, mut socket: WebSocket) {
    state.ws_connections.fetch_add(1, Ordering::SeqCst);
    for frame in &state.config.frames {
        if socket.send(Message::Text(frame.clone().into())).await.is_err() {
            return;
        }
    }
    if state.config.close_after_frames {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    while let Some(Ok(message)) = socket.recv().await {
        if let Message::Close(_) = message {
            return;
        }
    }
}

impl FakeStation {
    pub async fn spawn(config: FakeStationConfig) -> Self {
        let state = Arc::new(FakeState {
            config,
            ..Default::default()
        });

        let app = Router::new()
            .route("/song", get(song))
            .route("/ws", get(ws))
            .route("/ready", get(|| async { "ok" }))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake station failed");
        });

        let station = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            port,
            state,
            _shutdown_tx: Some(shutdown_tx),
        };
        station.wait_for_ready().await;
        station
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        loop {
            if start.elapsed() > Duration::from_millis(SERVER_READY_TIMEOUT_MS) {
                panic!(
                    "Fake station did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }
            match client.get(format!("{}/ready", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await
                }
            }
        }
    }

    pub fn song_url(&self) -> String {
        format!("{}/song", self.base_url)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Queue the next `/song` response.
    pub fn push_song(&self, status: StatusCode, body: impl Into<String>) {
        self.state
            .songs
            .lock()
            .unwrap()
            .push_back((status, body.into()));
    }

    pub fn push_song_json(&self, body: &serde_json::Value) {
        self.push_song(StatusCode::OK, body.to_string());
    }

    pub fn song_requests(&self) -> usize {
        self.state.song_requests.load(Ordering::SeqCst)
    }

    pub fn ws_connections(&self) -> usize {
        self.state.ws_connections.load(Ordering::SeqCst)
    }
}

impl Drop for FakeStation {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
