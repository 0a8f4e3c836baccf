//! Exponential backoff for the ingest loop.
//!
//! Keeps a weather-provider outage from turning into a tight retry loop and
//! a log storm. Growth is doubling from a base delay, capped, with a small
//! deterministic jitter so restarted replicas don't retry in lockstep.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    consecutive_failures: u32,
    next_attempt_at: Instant,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            cap: cap.max(base),
            consecutive_failures: 0,
            next_attempt_at: Instant::now(),
        }
    }

    /// Whether the current wait has elapsed.
    pub fn ready(&self) -> bool {
        Instant::now() >= self.next_attempt_at
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record a success: the next attempt may run immediately.
    pub fn succeed(&mut self) {
        self.consecutive_failures = 0;
        self.next_attempt_at = Instant::now();
    }

    /// Record a failure and return the wait applied before the next attempt.
    pub fn fail(&mut self) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let delay = jittered(self.delay_for(self.consecutive_failures));
        self.next_attempt_at = Instant::now() + delay;
        delay
    }

    /// Doubling schedule: base * 2^(failures - 1), capped.
    fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(20);
        self.base
            .saturating_mul(1u32 << exponent)
            .min(self.cap)
    }
}

/// Add up to 20% jitter derived from the subsecond clock.
fn jittered(delay: Duration) -> Duration {
    let window_ms = delay.as_millis() / 5;
    if window_ms == 0 {
        return delay;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u128)
        .unwrap_or(0);
    delay + Duration::from_millis((nanos % (window_ms + 1)) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_backoff_is_ready() {
        let backoff = Backoff::new(Duration::from_millis(10), Duration::from_secs(1));
        assert!(backoff.ready());
        assert_eq!(backoff.consecutive_failures(), 0);
    }

    #[test]
    fn failures_grow_the_delay_until_success() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(60));

        let first = backoff.fail();
        assert!(first >= Duration::from_millis(100));
        assert!(!backoff.ready());

        let second = backoff.fail();
        assert!(second >= Duration::from_millis(200));
        assert_eq!(backoff.consecutive_failures(), 2);

        backoff.succeed();
        assert!(backoff.ready());
        assert_eq!(backoff.consecutive_failures(), 0);
    }

    #[test]
    fn delay_saturates_at_cap() {
        let mut backoff = Backoff::new(Duration::from_millis(10), Duration::from_millis(40));
        for _ in 0..12 {
            backoff.fail();
        }
        let delay = backoff.fail();
        // Cap plus at most 20% jitter.
        assert!(delay >= Duration::from_millis(40));
        assert!(delay <= Duration::from_millis(48));
    }
}
