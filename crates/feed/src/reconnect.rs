use std::time::Duration;

/// Knobs for the stream reconnect schedule.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling for the doubled delay.
    pub max_delay: Duration,
    /// Consecutive failures tolerated before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

/// Exponential backoff over consecutive connection failures.
///
/// Each failure either yields the delay to wait before the next
/// attempt, or `None` once the budget is spent. A successful
/// connection resets the counter.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    failures: u32,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Record one failed attempt. `Some(delay)` schedules a retry;
    /// `None` means the failure budget is exhausted.
    pub fn after_failure(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= self.config.max_attempts {
            return None;
        }

        let shift = (self.failures - 1).min(31);
        let millis = (self.config.base_delay.as_millis() as u64).saturating_mul(1 << shift);
        let capped = millis.min(self.config.max_delay.as_millis() as u64);
        Some(Duration::from_millis(capped))
    }

    /// Reset after a successful connection.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy::new(ReconnectConfig {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts,
        })
    }

    #[test]
    fn delays_double_per_failure() {
        let mut policy = policy(10);
        assert_eq!(policy.after_failure(), Some(Duration::from_secs(1)));
        assert_eq!(policy.after_failure(), Some(Duration::from_secs(2)));
        assert_eq!(policy.after_failure(), Some(Duration::from_secs(4)));
        assert_eq!(policy.after_failure(), Some(Duration::from_secs(8)));
        assert_eq!(policy.after_failure(), Some(Duration::from_secs(16)));
        // Capped at 30s from here on.
        assert_eq!(policy.after_failure(), Some(Duration::from_secs(30)));
        assert_eq!(policy.after_failure(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn budget_exhausts_on_fifth_failure() {
        let mut policy = policy(5);
        assert!(policy.after_failure().is_some());
        assert!(policy.after_failure().is_some());
        assert!(policy.after_failure().is_some());
        assert!(policy.after_failure().is_some());
        assert_eq!(policy.after_failure(), None);
        assert_eq!(policy.failures(), 5);
    }

    #[test]
    fn reset_restores_budget_and_base_delay() {
        let mut policy = policy(5);
        let _ = policy.after_failure();
        let _ = policy.after_failure();
        assert_eq!(policy.failures(), 2);

        policy.reset();
        assert_eq!(policy.failures(), 0);
        assert_eq!(policy.after_failure(), Some(Duration::from_secs(1)));
    }
}
