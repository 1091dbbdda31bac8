use std::sync::{Mutex, MutexGuard, PoisonError};

use super::record::NormalizedRecord;

/// Append-only record buffer shared by a station's producers and its
/// upload scheduler.
///
/// `append` and `drain` serialize on one lock, so a record is returned by
/// exactly one drain.
#[derive(Debug, Default)]
pub struct BatchBuffer {
    records: Mutex<Vec<NormalizedRecord>>,
}

impl BatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: NormalizedRecord) {
        self.lock().push(record);
    }

    /// Take everything buffered so far, leaving the buffer empty.
    pub fn drain(&self) -> Vec<NormalizedRecord> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clone of the current contents, for inspection only.
    pub fn snapshot(&self) -> Vec<NormalizedRecord> {
        self.lock().clone()
    }

    // A panic while holding the lock cannot leave a Vec half-pushed.
    fn lock(&self) -> MutexGuard<'_, Vec<NormalizedRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
