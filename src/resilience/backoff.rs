//! Exponential backoff with jitter for watch reconnects.

use std::time::Duration;

use rand::Rng;

/// Delay before the first reconnect attempt.
pub const WATCH_BASE_DELAY: Duration = Duration::from_millis(500);

/// Upper bound for any reconnect delay, before jitter.
pub const WATCH_MAX_DELAY: Duration = Duration::from_secs(30);

/// Delay before reconnect attempt `attempt` (1-based).
///
/// Doubles from `base` per attempt, capped at `max`, plus up to 10% jitter.
pub fn reconnect_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
    let capped = base.saturating_mul(factor).min(max);

    let jitter_ms = capped.as_millis() as u64 / 10;
    let jitter = if jitter_ms > 0 {
        rand::thread_rng().gen_range(0..jitter_ms)
    } else {
        0
    };

    capped + Duration::from_millis(jitter)
}

/// Reconnect attempt counter for one watch.
#[derive(Debug)]
pub struct ReconnectBackoff {
    attempt: u32,
    base: Duration,
    max: Duration,
}

impl ReconnectBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { attempt: 0, base, max }
    }

    /// Record a failure and return how long to wait before reconnecting.
    pub fn failed(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        reconnect_delay(self.attempt, self.base, self.max)
    }

    /// The watch got back in sync; the next failure starts from `base` again.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_until_cap() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(1000);

        assert_eq!(reconnect_delay(0, base, max), Duration::ZERO);

        let first = reconnect_delay(1, base, max);
        assert!(first >= base && first < Duration::from_millis(110));

        let third = reconnect_delay(3, base, max);
        assert!(third >= Duration::from_millis(400) && third < Duration::from_millis(440));

        let late = reconnect_delay(40, base, max);
        assert!(late >= max && late < Duration::from_millis(1100));
    }

    #[test]
    fn test_reset_after_sync_restarts_from_base() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(1000);
        let mut backoff = ReconnectBackoff::new(base, max);

        for _ in 0..6 {
            backoff.failed();
        }
        assert!(backoff.failed() >= max);
        assert_eq!(backoff.attempt(), 7);

        backoff.reset();
        let delay = backoff.failed();
        assert!(delay >= base && delay < Duration::from_millis(110));
        assert_eq!(backoff.attempt(), 1);
    }
}
