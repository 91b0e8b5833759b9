//! In-memory result store for testing.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::stage::ScoredResult;
use crate::store::{ResultStore, StoreError};

/// [`ResultStore`] that keeps appended results in a vector.
///
/// Can be told to fail after a number of successful appends.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: Mutex<Vec<ScoredResult>>,
    fail_after: Option<usize>,
    flushes: AtomicUsize,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `appends` results, then fail every append with an I/O error.
    pub fn failing_after(appends: usize) -> Self {
        Self {
            fail_after: Some(appends),
            ..Self::default()
        }
    }

    /// Everything appended so far, in order.
    pub fn appended(&self) -> Vec<ScoredResult> {
        self.results
            .lock()
            .map(|results| results.clone())
            .unwrap_or_default()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl ResultStore for MemoryResultStore {
    fn append(&self, result: &ScoredResult) -> Result<(), StoreError> {
        let mut results = self
            .results
            .lock()
            .map_err(|_| StoreError::Io(io::Error::other("lock poisoned")))?;

        if self.fail_after.is_some_and(|limit| results.len() >= limit) {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::StorageFull,
                "mock store full",
            )));
        }

        results.push(result.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ScoredResult>, StoreError> {
        Ok(self.appended())
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
