//! Step retry/backoff policy (§4.3, §7 "retries are a property of the
//! step").

use std::time::Duration;

use orch_domain::workflow::RetryConfig;

pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, config: &RetryConfig, attempts_so_far: u32) -> bool;
    fn backoff(&self, config: &RetryConfig, attempts_so_far: u32) -> Duration;
}

/// Fixed backoff: sleeps `backoff_seconds` between every attempt, up to
/// `max_attempts` total tries.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedBackoffRetryPolicy;

impl RetryPolicy for FixedBackoffRetryPolicy {
    fn should_retry(&self, config: &RetryConfig, attempts_so_far: u32) -> bool {
        attempts_so_far < config.max_attempts.max(1)
    }

    fn backoff(&self, config: &RetryConfig, _attempts_so_far: u32) -> Duration {
        Duration::from_secs(config.backoff_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_until_max_attempts_then_stops() {
        let policy = FixedBackoffRetryPolicy;
        let cfg = RetryConfig { max_attempts: 3, backoff_seconds: 1 };
        assert!(policy.should_retry(&cfg, 1));
        assert!(policy.should_retry(&cfg, 2));
        assert!(!policy.should_retry(&cfg, 3));
    }

    #[test]
    fn zero_configured_attempts_still_tries_once() {
        let policy = FixedBackoffRetryPolicy;
        let cfg = RetryConfig { max_attempts: 0, backoff_seconds: 0 };
        assert!(policy.should_retry(&cfg, 0));
        assert!(!policy.should_retry(&cfg, 1));
    }
}
