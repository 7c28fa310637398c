use rand::Rng;
use std::time::Duration;

/// Exponential backoff with jitter for outbound provider calls
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u8) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn delay(&self, attempt: u8) -> Duration {
        let base_delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1) as u32));
        let jitter = rand::thread_rng().gen_range(0.8..=1.2);
        let delay = Duration::from_millis((base_delay.as_millis() as f64 * jitter) as u64);
        std::cmp::min(delay, self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    }

    #[test]
    fn test_delay_grows_and_is_capped() {
        let policy = RetryPolicy::new(5);
        let first = policy.delay(1);
        assert!(first >= Duration::from_millis(160) && first <= Duration::from_millis(240));
        let third = policy.delay(3);
        assert!(third >= Duration::from_millis(640) && third <= Duration::from_millis(960));
        assert!(policy.delay(30) <= Duration::from_secs(30));
    }
}
