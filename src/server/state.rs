use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;
use crate::supervisor::Supervisor;

pub type GuardedSupervisor = Arc<Supervisor>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub supervisor: GuardedSupervisor,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedSupervisor {
    fn from_ref(input: &ServerState) -> Self {
        input.supervisor.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
