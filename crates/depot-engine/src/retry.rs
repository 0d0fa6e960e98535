//! # Retry Policy
//!
//! Linear backoff for lost optimistic updates.
//!
//! ```text
//! attempt 1 ──conflict──► sleep 1 × base ──► attempt 2 ──conflict──►
//! sleep 2 × base ──► attempt 3 ──conflict──► give up (max_attempts = 3)
//! ```

use std::time::Duration;

use backoff::backoff::Backoff;

use crate::config::RetrySettings;

/// Attempt bound and delay unit for the manager's retry driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Never below 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A fresh schedule for one logical operation.
    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff {
            base: self.base_delay,
            max_attempts: self.max_attempts,
            failed: 0,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy::new(
            settings.max_attempts,
            Duration::from_millis(settings.base_delay_ms),
        )
    }
}

/// `base × n` after the n-th failed attempt; `None` once the bound is spent.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base: Duration,
    max_attempts: u32,
    failed: u32,
}

impl LinearBackoff {
    /// Failed attempts recorded so far.
    pub fn attempts(&self) -> u32 {
        self.failed
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.failed = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.failed += 1;
        if self.failed >= self.max_attempts {
            return None;
        }
        Some(self.base * self.failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_schedule() {
        let mut backoff = RetryPolicy::default().backoff();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(10)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(20)));
        assert_eq!(backoff.next_backoff(), None);
        assert_eq!(backoff.attempts(), 3);

        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_single_attempt_never_sleeps() {
        let mut backoff = RetryPolicy::new(0, Duration::from_millis(10)).backoff();
        assert_eq!(backoff.next_backoff(), None);
    }

    #[test]
    fn test_from_settings() {
        let settings = RetrySettings {
            max_attempts: 5,
            base_delay_ms: 4,
        };
        let policy = RetryPolicy::from(&settings);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(4));
    }
}
