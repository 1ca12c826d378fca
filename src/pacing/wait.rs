//! Cooperative cancellation and chunked waiting
//!
//! Every wait in the crate goes through [`interruptible_sleep`], which never
//! sleeps longer than [`WAIT_INCREMENT`] at a time and polls the shared
//! [`CancellationSignal`] before each increment. That bounds cancellation
//! latency to one increment no matter how long the requested wait is.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Longest single sleep between two cancellation polls
pub const WAIT_INCREMENT: Duration = Duration::from_millis(100);

/// Shared stop flag, set from outside the worker and polled by it
///
/// Cloning shares the flag. Setting and reading are lock-free.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    flag: Arc<AtomicBool>,
}

impl CancellationSignal {
    /// Creates a cleared signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation (idempotent)
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Clears the flag so the signal can be reused for another run
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    /// Returns true once cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// How an interruptible wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full duration elapsed
    Elapsed,

    /// The signal was observed before the duration elapsed
    Cancelled,
}

impl WaitOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Waits for `total`, polling `cancel` before every increment
///
/// Returns [`WaitOutcome::Cancelled`] as soon as the signal is seen, including
/// when it is already set on entry.
pub async fn interruptible_sleep(total: Duration, cancel: &CancellationSignal) -> WaitOutcome {
    let deadline = Instant::now() + total;

    loop {
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }

        let now = Instant::now();
        if now >= deadline {
            return WaitOutcome::Elapsed;
        }

        sleep((deadline - now).min(WAIT_INCREMENT)).await;
    }
}
