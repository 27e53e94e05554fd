//! One-shot retry policy for rejected reply sends.
//!
//! A fresh event whose reply is rejected gets exactly one retry, performed
//! with a forced token refresh. An event already marked as a retry is never
//! retried again, whatever the outcome. The policy is a pure decision
//! function; the webhook drives the loop and sleeps the backoff.

use reqwest::StatusCode;
use std::time::Duration;

/// What to do after a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The attempt is terminal: delivered, suppressed, or out of retries.
    Done,
    /// Schedule the single forced-refresh retry.
    Retry,
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Decide the next transition after a send attempt.
    ///
    /// `expired` is the retry marker of the attempt that just ran; `status`
    /// is `None` when the send was suppressed. A retry is scheduled iff the
    /// send returned a status other than 200, the attempt was not itself a
    /// retry, and the retry ceiling has not been reached.
    pub fn evaluate(&self, attempt: u32, expired: bool, status: Option<StatusCode>) -> Decision {
        match status {
            Some(status)
                if status != StatusCode::OK && !expired && attempt < self.max_retries =>
            {
                Decision::Retry
            }
            _ => Decision::Done,
        }
    }

    /// Backoff before the given attempt number runs.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}
