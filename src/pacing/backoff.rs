//! Backoff policy for soft-block responses
//!
//! | Outcome                 | Delay                                  |
//! |-------------------------|----------------------------------------|
//! | `Retry-After: N` (N > 0) | `min(120, N)` seconds                  |
//! | otherwise               | `min(120, 2^min(6, attempt))` seconds  |

use crate::pacing::wait::{interruptible_sleep, CancellationSignal, WaitOutcome};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Hard ceiling on any single backoff wait
pub const BACKOFF_CEILING: Duration = Duration::from_secs(120);

/// Exponent at which exponential growth stops
pub const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Computes and performs backoff waits
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    ceiling: Duration,
    max_exponent: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            ceiling: BACKOFF_CEILING,
            max_exponent: MAX_BACKOFF_EXPONENT,
        }
    }
}

impl BackoffPolicy {
    /// Returns the wait for the given attempt number
    ///
    /// `attempt` counts retry-triggering outcomes for the item so far in this
    /// run. A positive `retry_after` (seconds) overrides the exponential curve.
    pub fn compute_delay(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        let delay = match retry_after {
            Some(seconds) if seconds > 0 => Duration::from_secs(seconds),
            _ => Duration::from_secs(1u64 << attempt.min(self.max_exponent)),
        };
        delay.min(self.ceiling)
    }

    /// Sleeps for the computed delay, returning early on cancellation
    pub async fn wait(
        &self,
        attempt: u32,
        retry_after: Option<u64>,
        cancel: &CancellationSignal,
    ) -> WaitOutcome {
        let delay = self.compute_delay(attempt, retry_after);
        tracing::info!("Backoff: sleeping {} s (attempt {})", delay.as_secs(), attempt);
        interruptible_sleep(delay, cancel).await
    }
}

/// Reads a delta-seconds `Retry-After` header
///
/// HTTP-date values, zero, and anything non-numeric are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    value.parse::<u64>().ok().filter(|seconds| *seconds > 0)
}
