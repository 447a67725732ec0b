use std::time::Duration;

/// Bounded exponential backoff for model-call retries.
///
/// The delay doubles from `base_delay` on every attempt, is capped at
/// `max_delay`, and gets a uniform random jitter in `[0, jitter]` added on
/// top so that many concurrent invocations hitting the same rate limit do
/// not retry in lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first call. 1 disables retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Maximum random jitter added to each delay. `Duration::ZERO`
    /// disables it (useful in tests asserting exact delays).
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    /// 3 attempts; 500 ms, 1 s, 2 s... capped at 8 s, plus up to 250 ms
    /// of jitter.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to sleep after a failed attempt (1-indexed: attempt 1 is the
    /// first call). Exponential without jitter, so the schedule itself is
    /// deterministic and testable.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(exponent));
        std::cmp::min(delay, self.max_delay)
    }

    /// `backoff_for_attempt` plus the random jitter component.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.backoff_for_attempt(attempt);
        if self.jitter.is_zero() {
            return base;
        }
        base + Duration::from_millis(jitter_ms(self.jitter.as_millis() as u64))
    }
}

// Clock-seeded xorshift. Good enough to decorrelate retry storms without
// pulling in the `rand` crate; not for anything security-relevant.
fn jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}
