//! Station adapters: the transports that feed a [`StationIngest`].
//!
//! Every adapter is either stopped or running. Starting an already running
//! adapter is a no-op, and stopping is cooperative: the loop notices the
//! cancellation at its next suspension point.

mod error;
mod poll;
mod stream;
mod webhook;

pub use error::{decode_object, TransportError};
pub use poll::PollAdapter;
pub use stream::StreamAdapter;
pub use webhook::WebhookAdapter;

use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::ingest::{RecordKind, StationIngest};
use crate::stations::StationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Poll,
    Stream,
    Webhook,
}

#[async_trait]
pub trait StationAdapter: Send + Sync {
    fn station(&self) -> StationId;
    fn kind(&self) -> RecordKind;
    fn strategy(&self) -> Strategy;
    fn state(&self) -> AdapterState;

    /// Returns `false` when the adapter was already running.
    fn start(self: Arc<Self>) -> bool;

    fn stop(&self);

    /// Wait for the loop to exit. Returns `false` if it had to be abandoned
    /// after `grace`.
    async fn join(&self, grace: Duration) -> bool;
}

struct Running {
    stop: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Start/stop bookkeeping shared by the adapters and the upload scheduler.
#[derive(Default)]
pub struct Lifecycle {
    running: Mutex<Option<Running>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` unless a previous start is still live.
    pub fn start<F, Fut>(&self, task: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.lock();
        if Self::is_live(&running) {
            return false;
        }
        let stop = CancellationToken::new();
        let handle = tokio::spawn(task(stop.clone()));
        *running = Some(Running {
            stop,
            task: Some(handle),
        });
        true
    }

    /// Mark as running without a task of its own (webhooks are driven by
    /// the HTTP server).
    pub fn start_passive(&self) -> bool {
        let mut running = self.lock();
        if Self::is_live(&running) {
            return false;
        }
        *running = Some(Running {
            stop: CancellationToken::new(),
            task: None,
        });
        true
    }

    pub fn stop(&self) {
        if let Some(running) = self.lock().as_ref() {
            running.stop.cancel();
        }
    }

    pub fn state(&self) -> AdapterState {
        if Self::is_live(&self.lock()) {
            AdapterState::Running
        } else {
            AdapterState::Stopped
        }
    }

    pub async fn join(&self, grace: Duration) -> bool {
        let taken = self
            .lock()
            .as_mut()
            .and_then(|running| Some((running.task.take()?, running.stop.clone())));
        let Some((mut handle, stop)) = taken else {
            return true;
        };

        // Without its handle the task can no longer be observed; whatever
        // happens below, it is no longer running.
        let joined = tokio::time::timeout(grace, &mut handle).await;
        stop.cancel();
        match joined {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Task ended abnormally: {}", e);
                true
            }
            Err(_) => {
                warn!("Task did not stop within {:?}, aborting", grace);
                handle.abort();
                false
            }
        }
    }

    /// Not stopped, and the spawned task (if any) has not exited on its own.
    fn is_live(running: &Option<Running>) -> bool {
        running.as_ref().is_some_and(|running| {
            !running.stop.is_cancelled()
                && !running.task.as_ref().is_some_and(JoinHandle::is_finished)
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared fields of every adapter.
pub(crate) struct AdapterCore {
    pub ingest: Arc<StationIngest>,
    pub kind: RecordKind,
    pub lifecycle: Lifecycle,
}

impl AdapterCore {
    pub fn new(ingest: Arc<StationIngest>, kind: RecordKind) -> Self {
        Self {
            ingest,
            kind,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn station(&self) -> StationId {
        self.ingest.profile().id
    }

    pub fn station_name(&self) -> &'static str {
        self.ingest.station_name()
    }
}
