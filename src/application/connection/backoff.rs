//! Reconnect delay schedule.

use std::time::Duration;

/// Exponential backoff with a hard attempt ceiling.
///
/// Attempt `k` (1-based) waits `base * 2^(k-1)`. Once `max_attempts`
/// attempts have been handed out, [`next_delay`](Self::next_delay) returns
/// `None` until [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl Backoff {
    #[must_use]
    pub const fn new(base: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_attempts,
            attempts: 0,
        }
    }

    /// Attempts handed out since the last reset.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Claim the next attempt and return its delay, or `None` at the ceiling.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.delay_for(self.attempts))
    }

    /// Delay for 1-based attempt `k`. Saturates instead of overflowing.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor)
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_from_base() {
        let mut backoff = Backoff::new(Duration::from_millis(1000), 5);
        let delays: Vec<u128> = std::iter::from_fn(|| backoff.next_delay())
            .map(|d| d.as_millis())
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn reset_restarts_the_schedule() {
        let mut backoff = Backoff::new(Duration::from_millis(250), 2);
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), None);

        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn zero_ceiling_never_retries() {
        let mut backoff = Backoff::new(Duration::from_millis(1000), 0);
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn huge_attempt_numbers_saturate() {
        let backoff = Backoff::new(Duration::from_secs(1), u32::MAX);
        assert_eq!(backoff.delay_for(40), Duration::from_secs(u64::from(u32::MAX)));
    }
}
