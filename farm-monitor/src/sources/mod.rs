pub mod api;

use std::time::Duration;

pub use api::ApiSensorSource;

/// Attempts per poll. `max_attempts = 1` means a failed poll is not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Linear backoff: the n-th retry waits `delay * n`.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::from_secs(1),
        }
    }
}
