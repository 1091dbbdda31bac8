//! In-process sink that records every put.

#![allow(dead_code)]

use async_trait::async_trait;
use radio_ingest::upload::{BatchSink, SinkError};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingSink {
    puts: Mutex<Vec<(String, Vec<u8>)>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.puts.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
    }

    /// Every uploaded body, parsed.
    pub fn batches(&self) -> Vec<(String, Vec<Value>)> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .map(|(key, body)| {
                let records: Vec<Value> = serde_json::from_slice(body).unwrap();
                (key.clone(), records)
            })
            .collect()
    }
}

#[async_trait]
impl BatchSink for RecordingSink {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), SinkError> {
        // Failed puts are recorded too, so tests can see what was attempted.
        self.puts.lock().unwrap().push((key.to_string(), body));
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Io(std::io::Error::other("sink unavailable")));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "recording".to_string()
    }
}
