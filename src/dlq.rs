use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{Advisory, DeadLetterQueue, Error, Rejection};

/// Anything a batch command produced besides a clean success.
#[derive(Debug, thiserror::Error)]
pub enum DeadLetter {
    #[error("{command}: {error}")]
    Failed { command: String, error: Error },

    #[error("{command}: rejected: {reason}")]
    Rejected { command: String, reason: Rejection },

    #[error("{command}: advisory: {advisory}")]
    Advisory { command: String, advisory: Advisory },
}

#[derive(Default, Debug)]
pub struct StdErrDlq {
    reported: AtomicUsize,
}

impl StdErrDlq {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reported(&self) -> usize {
        self.reported.load(Ordering::Relaxed)
    }
}

impl DeadLetterQueue for StdErrDlq {
    fn report(&self, letter: &DeadLetter) {
        self.reported.fetch_add(1, Ordering::Relaxed);
        eprintln!("DLQ Report - {}", letter);
    }
}
