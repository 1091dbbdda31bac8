//! Shared constants for end-to-end tests

/// Maximum time to wait for the fake station to accept connections
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness checks
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Maximum time `wait_until` waits for a condition
pub const WAIT_TIMEOUT_MS: u64 = 5000;

pub const WAIT_POLL_INTERVAL_MS: u64 = 10;
