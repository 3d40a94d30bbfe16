//! Progress reporting and cooperative cancellation for long-running suites.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress update sent while a Monte Carlo test runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Test name (`permutation`, `bootstrap`, `randomized_entry`).
    pub test: &'static str,
    /// Iterations finished so far, in any order.
    pub completed: usize,
    pub total: usize,
}

/// Progress callback. Called from worker threads.
pub type ProgressFn = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;
