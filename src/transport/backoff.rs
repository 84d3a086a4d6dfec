//! Exponential backoff state used between reconnect attempts.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::config::BackoffPolicy;

const MIN_SLEEP_MS: u64 = 10;

/// Tracks consecutive failures and produces jittered delays.
pub struct BackoffState {
    policy: BackoffPolicy,
    current: Duration,
    failure_since: Option<Instant>,
    last_success: Option<Instant>,
    rng: StdRng,
}

impl BackoffState {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.base,
            failure_since: None,
            last_success: None,
            rng: StdRng::from_entropy(),
            policy,
        }
    }

    /// Record a successful connect.
    ///
    /// The delay window resets once failures have been behind us for
    /// `reset_after`, or immediately when the previous success is that old.
    pub fn record_success(&mut self, now: Instant) {
        let stale_failure = self
            .failure_since
            .is_some_and(|start| now.duration_since(start) >= self.policy.reset_after);
        let stale_success = self
            .last_success
            .is_some_and(|last| now.duration_since(last) >= self.policy.reset_after);
        if stale_failure || stale_success {
            self.current = self.policy.base;
            self.failure_since = None;
        }
        self.last_success = Some(now);
    }

    /// Delay before the next attempt following a failure.
    pub fn next_sleep(&mut self, now: Instant) -> Duration {
        match self.failure_since {
            Some(_) => self.current = self.current.saturating_mul(2).min(self.policy.cap),
            None => self.failure_since = Some(now),
        }

        let max_ms = self.current.as_millis().min(u128::from(u64::MAX)) as u64;
        let sleep_ms = match max_ms {
            0 => MIN_SLEEP_MS,
            1..=MIN_SLEEP_MS => max_ms,
            _ => self.rng.gen_range(MIN_SLEEP_MS..=max_ms),
        };
        Duration::from_millis(sleep_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base_ms: u64, cap_ms: u64) -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_millis(base_ms),
            cap: Duration::from_millis(cap_ms),
            reset_after: Duration::from_millis(1_000),
        }
    }

    #[test]
    fn enforces_minimum_sleep() {
        let mut backoff = BackoffState::new(policy(0, 0));
        let sleep = backoff.next_sleep(Instant::now());
        assert!(sleep >= Duration::from_millis(MIN_SLEEP_MS));
    }

    #[test]
    fn grows_up_to_cap() {
        let mut backoff = BackoffState::new(policy(100, 400));
        let now = Instant::now();
        for _ in 0..10 {
            assert!(backoff.next_sleep(now) <= Duration::from_millis(400));
        }
        assert_eq!(backoff.current, Duration::from_millis(400));
    }

    #[test]
    fn resets_after_sustained_recovery() {
        let mut backoff = BackoffState::new(policy(100, 1_000));
        let now = Instant::now();
        backoff.next_sleep(now);
        backoff.next_sleep(now);
        assert_eq!(backoff.current, Duration::from_millis(200));

        backoff.record_success(now + Duration::from_millis(10));
        assert_eq!(backoff.current, Duration::from_millis(200));

        backoff.record_success(now + Duration::from_millis(1_500));
        assert_eq!(backoff.current, Duration::from_millis(100));
    }
}
