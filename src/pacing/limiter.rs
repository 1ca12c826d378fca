//! Token bucket rate limiter
//!
//! Tokens accrue continuously at `requests_per_minute / 60` per second up to
//! `burst`. Refill and consumption happen in one critical section; waiting for
//! the next token happens outside the lock through the interruptible wait.

use crate::config::RateConfig;
use crate::pacing::wait::{interruptible_sleep, CancellationSignal};
use crate::ConfigError;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Shortest wait before re-checking the bucket
const MIN_TOKEN_WAIT: Duration = Duration::from_millis(50);

/// Result of asking the bucket for a permit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// One token was consumed
    Acquired,

    /// Cancellation was observed first; no token was consumed
    Cancelled,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket governing request pacing
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    rate_per_second: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a full bucket
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` when either parameter is zero.
    pub fn new(requests_per_minute: u32, burst: u32) -> Result<Self, ConfigError> {
        if requests_per_minute == 0 {
            return Err(ConfigError::Validation(
                "requests_per_minute must be >= 1".to_string(),
            ));
        }
        if burst == 0 {
            return Err(ConfigError::Validation("burst must be >= 1".to_string()));
        }

        let capacity = f64::from(burst);
        Ok(Self {
            capacity,
            rate_per_second: f64::from(requests_per_minute) / 60.0,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        })
    }

    /// Creates a bucket from the `[rate]` configuration table
    pub fn from_config(config: &RateConfig) -> Result<Self, ConfigError> {
        Self::new(config.requests_per_minute, config.burst)
    }

    /// Tokens currently available, after refilling up to now
    pub fn available(&self) -> f64 {
        let mut state = self.lock_state();
        self.refill(&mut state, Instant::now());
        state.tokens
    }

    /// Waits for and consumes one token
    ///
    /// Returns [`AcquireOutcome::Cancelled`] without consuming anything if the
    /// signal is set on entry or while waiting.
    pub async fn acquire(&self, cancel: &CancellationSignal) -> AcquireOutcome {
        loop {
            if cancel.is_cancelled() {
                return AcquireOutcome::Cancelled;
            }

            let wait = match self.try_take() {
                Ok(()) => return AcquireOutcome::Acquired,
                Err(wait) => wait.max(MIN_TOKEN_WAIT),
            };

            tracing::trace!("Rate limiter empty, waiting {:?}", wait);
            if interruptible_sleep(wait, cancel).await.is_cancelled() {
                return AcquireOutcome::Cancelled;
            }
        }
    }

    /// Refills and tries to consume one token
    ///
    /// On failure returns the time until one full token will have accrued.
    fn try_take(&self) -> Result<(), Duration> {
        let mut state = self.lock_state();
        self.refill(&mut state, Instant::now());

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - state.tokens;
            Err(Duration::from_secs_f64(missing / self.rate_per_second))
        }
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill);
        state.tokens =
            (state.tokens + elapsed.as_secs_f64() * self.rate_per_second).min(self.capacity);
        state.last_refill = now;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BucketState> {
        // The critical section cannot leave the state half-updated, so a
        // poisoned lock still holds a consistent bucket.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
