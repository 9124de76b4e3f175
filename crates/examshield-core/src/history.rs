//! In-memory attempt history.

use std::sync::{Mutex, PoisonError};

use crate::results::AttemptResult;
use crate::traits::ResultSink;

/// Attempt results recorded during this process, newest first.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    attempts: Mutex<Vec<AttemptResult>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every attempt, newest first.
    pub fn attempts(&self) -> Vec<AttemptResult> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn latest(&self) -> Option<AttemptResult> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .first()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for InMemoryHistory {
    fn record(&self, result: &AttemptResult) {
        tracing::debug!("recording attempt {} in history", result.id);
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(0, result.clone());
    }
}
