//! Retry policy for transient sink failures.
//!
//! A failing batch write is retried up to a fixed bound with a configurable
//! backoff; exhausting the bound surfaces the last error to the caller, which
//! treats it as fatal to the pipeline run.

use std::time::Duration;

use anyhow::Result;
use tracing::warn;

/// Retry configuration.
///
/// `max_retries` counts retries beyond the initial attempt, so an operation
/// may run at most `max_retries + 1` times.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: usize,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on the delay between retries.
    pub max_backoff: Duration,
    /// Backoff multiplier (1.0 for a fixed interval).
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Fixed-interval retries.
    pub fn fixed(max_retries: usize, interval: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff: interval,
            max_backoff: interval,
            multiplier: 1.0,
        }
    }

    /// Exponential backoff doubling from `initial_backoff`, capped at 30s.
    pub fn exponential(max_retries: usize, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    /// Delay before the given retry (1-based).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = (attempt as i32).saturating_sub(1);
        let delay = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }

    /// Return `true` if another retry is allowed after `retries_made` retries.
    pub fn should_retry(&self, retries_made: usize) -> bool {
        retries_made < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(5, Duration::from_millis(100))
    }
}

/// Run `op`, retrying per `policy` on failure.
///
/// Sleeps between attempts on the calling thread. Returns the last error
/// once the retry budget is exhausted.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    label: &str,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut retries = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if !policy.should_retry(retries) => return Err(e),
            Err(e) => {
                retries += 1;
                warn!(retry = retries, max = policy.max_retries, error = %e, "{label} failed, retrying");
                let delay = policy.delay_for_attempt(retries);
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_fixed_policy_delay() {
        let policy = RetryPolicy::fixed(5, Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(200));
    }

    #[test]
    fn test_exponential_policy_delay() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            multiplier: 2.0,
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        // Capped by max_backoff.
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(350));
    }

    #[test]
    fn test_should_retry_bound() {
        let policy = RetryPolicy::fixed(5, Duration::ZERO);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(4));
        assert!(!policy.should_retry(5));
    }

    #[test]
    fn test_with_retry_eventual_success() {
        let policy = RetryPolicy::fixed(5, Duration::ZERO);
        let mut attempts = 0;
        let result = with_retry(&policy, "op", || {
            attempts += 1;
            if attempts < 5 {
                Err(anyhow!("transient"))
            } else {
                Ok(attempts)
            }
        });
        // Four failures then success on the fifth attempt, within budget.
        assert_eq!(result.unwrap(), 5);
    }

    #[test]
    fn test_with_retry_exhausted_returns_last_error() {
        let policy = RetryPolicy::fixed(2, Duration::ZERO);
        let mut attempts = 0;
        let result: Result<()> = with_retry(&policy, "op", || {
            attempts += 1;
            Err(anyhow!("always down"))
        });
        assert!(result.is_err());
        assert_eq!(attempts, 3, "initial attempt plus two retries");
    }
}
