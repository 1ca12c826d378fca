//! Pacing primitives shared by the fetch client and the run orchestrator
//!
//! This module contains:
//! - The cancellation signal and the interruptible wait every suspension point uses
//! - The token bucket that bounds request rate
//! - The backoff policy applied after soft-block responses

mod backoff;
mod limiter;
mod wait;

pub use backoff::{parse_retry_after, BackoffPolicy, BACKOFF_CEILING, MAX_BACKOFF_EXPONENT};
pub use limiter::{AcquireOutcome, TokenBucket};
pub use wait::{interruptible_sleep, CancellationSignal, WaitOutcome, WAIT_INCREMENT};
