//! Exponential reconnect policy.
//!
//! Attempt `k` (1-based) waits `base_delay * multiplier^(k-1)`. With the
//! defaults that is 1s, 2s, 4s, 8s, 16s, after which the connection gives
//! up and reports exhaustion.

use std::time::Duration;

/// Reconnect backoff configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first attempt.
    pub base_delay: Duration,
    /// Growth factor per attempt.
    pub multiplier: u32,
    /// Attempts before giving up.
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Delay before attempt `attempt` (1-based). Saturates instead of
    /// overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = self.multiplier.saturating_pow(attempt - 1);
        self.base_delay.saturating_mul(factor)
    }

    /// Whether attempt number `attempt` is still allowed.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { base_delay: Duration::from_millis(1000), multiplier: 2, max_attempts: 5 }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn default_schedule() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u128> = (1..=5).map(|k| policy.delay_for(k).as_millis()).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
    }

    #[test]
    fn attempt_zero_has_no_delay() {
        assert_eq!(ReconnectPolicy::default().delay_for(0), Duration::ZERO);
    }

    #[test]
    fn huge_attempts_saturate() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(200), Duration::from_millis(1000).saturating_mul(u32::MAX));
    }

    #[test]
    fn allows_up_to_max() {
        let policy = ReconnectPolicy::default();
        assert!(policy.allows(5));
        assert!(!policy.allows(6));
    }

    proptest! {
        #[test]
        fn delay_doubles(base_ms in 1u64..10_000, attempt in 1u32..20) {
            let policy = ReconnectPolicy {
                base_delay: Duration::from_millis(base_ms),
                ..ReconnectPolicy::default()
            };
            prop_assert_eq!(
                policy.delay_for(attempt + 1),
                policy.delay_for(attempt) * 2
            );
            prop_assert_eq!(
                policy.delay_for(attempt),
                Duration::from_millis(base_ms) * 2u32.pow(attempt - 1)
            );
        }
    }
}
