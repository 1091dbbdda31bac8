//! Common test infrastructure
//!
//! Integration tests import from here only: a fake upstream station, a
//! recording sink, payload fixtures and a polling helper.

mod constants;
mod fixtures;
mod server;
mod sink;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::*;
pub use server::{FakeStation, FakeStationConfig};
#[allow(unused_imports)]
pub use sink::RecordingSink;

use std::time::Duration;

/// Poll `condition` until it holds, panicking after `WAIT_TIMEOUT_MS`.
#[allow(dead_code)]
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(WAIT_TIMEOUT_MS);
    while !condition() {
        if start.elapsed() > timeout {
            panic!("Timed out after {}ms waiting for {}", WAIT_TIMEOUT_MS, what);
        }
        tokio::time::sleep(Duration::from_millis(WAIT_POLL_INTERVAL_MS)).await;
    }
}
