use serde_json::{Map, Value};
use thiserror::Error;

/// Failures of a single poll tick or stream frame. None of them stop the
/// adapter; the unit of work is dropped and the loop carries on.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream answered {0}")]
    Status(reqwest::StatusCode),

    #[error("body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl TransportError {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            TransportError::Http(_) => "http",
            TransportError::Status(_) => "status",
            TransportError::Decode(_) => "decode",
            TransportError::NotAnObject => "not_an_object",
            TransportError::WebSocket(_) => "websocket",
        }
    }
}

/// Decode a document that must be a JSON object to carry record metadata.
pub fn decode_object(bytes: &[u8]) -> Result<Map<String, Value>, TransportError> {
    match serde_json::from_slice(bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(TransportError::NotAnObject),
    }
}
