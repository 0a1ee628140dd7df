//! In-memory sheet used by tests

use crate::{
    SheetRow,
    sheets::{SheetStore, StoreError},
};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Records every append call; can be told to fail the next N calls
#[derive(Default)]
pub struct MemorySheet {
    calls: Mutex<Vec<Vec<SheetRow>>>,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, times: usize) {
        self.failures_left.store(times, Ordering::SeqCst);
    }

    /// Rows of every successful append, one entry per call
    pub fn calls(&self) -> Vec<Vec<SheetRow>> {
        self.calls.lock().unwrap().clone()
    }

    /// Every append call, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SheetStore for MemorySheet {
    async fn append_rows(&self, rows: &[SheetRow]) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Api {
                status: 503,
                message: "The service is currently unavailable.".to_string(),
            });
        }

        self.calls.lock().unwrap().push(rows.to_vec());
        Ok(())
    }
}
