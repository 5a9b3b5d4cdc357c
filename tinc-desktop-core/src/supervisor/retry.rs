//! Bounded retry for the first control call after a spawn
//!
//! A sub-process worker has no readiness signal: its RPC server may not be
//! listening yet when the controller makes its first call. Callers wrap that
//! call in [`retry_transport`]; the spawner itself never retries.

use crate::error::WorkerError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Exponential backoff policy for transport failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupRetry {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds
    #[serde(default = "default_base_interval")]
    pub base_interval_ms: u64,

    /// Multiplier applied per attempt
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,

    /// Cap on a single delay, in milliseconds
    #[serde(default = "default_max_interval")]
    pub max_interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    10
}
fn default_base_interval() -> u64 {
    100
}
fn default_backoff_multiplier() -> u32 {
    2
}
fn default_max_interval() -> u64 {
    2000
}

impl Default for StartupRetry {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_interval_ms: default_base_interval(),
            backoff_multiplier: default_backoff_multiplier(),
            max_interval_ms: default_max_interval(),
        }
    }
}

impl StartupRetry {
    /// Validate the policy, reporting the first invalid field
    pub fn validate(&self) -> Result<(), RetryPolicyError> {
        if self.max_attempts < 1 || self.max_attempts > 50 {
            return Err(RetryPolicyError::InvalidMaxAttempts(self.max_attempts));
        }
        if self.base_interval_ms < 1 || self.base_interval_ms > 10_000 {
            return Err(RetryPolicyError::InvalidBaseInterval(self.base_interval_ms));
        }
        if self.backoff_multiplier < 1 || self.backoff_multiplier > 10 {
            return Err(RetryPolicyError::InvalidBackoffMultiplier(
                self.backoff_multiplier,
            ));
        }
        if self.max_interval_ms < self.base_interval_ms {
            return Err(RetryPolicyError::MaxIntervalLessThanBase(
                self.max_interval_ms,
                self.base_interval_ms,
            ));
        }
        Ok(())
    }

    /// Delay after a failed `attempt` (1-indexed)
    ///
    /// Formula: base_interval × multiplier^(attempt-1), capped at max_interval
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.backoff_multiplier).saturating_pow(attempt.saturating_sub(1));
        let interval = self.base_interval_ms.saturating_mul(factor);
        Duration::from_millis(interval.min(self.max_interval_ms))
    }
}

/// Validation errors for [`StartupRetry`]
#[derive(Debug, thiserror::Error)]
pub enum RetryPolicyError {
    #[error("max_attempts must be between 1 and 50, got: {0}")]
    InvalidMaxAttempts(u32),

    #[error("base_interval_ms must be between 1 and 10000, got: {0}")]
    InvalidBaseInterval(u64),

    #[error("backoff_multiplier must be between 1 and 10, got: {0}")]
    InvalidBackoffMultiplier(u32),

    #[error("max_interval_ms ({0}) must be >= base_interval_ms ({1})")]
    MaxIntervalLessThanBase(u64, u64),
}

/// Run `op`, retrying transport failures according to `policy`
///
/// Any other error, and the last transport error, is returned as-is.
pub async fn retry_transport<T, F, Fut>(policy: &StartupRetry, mut op: F) -> Result<T, WorkerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WorkerError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transport() && attempt < policy.max_attempts => {
                let delay = policy.calculate_backoff(attempt);
                debug!(
                    "Attempt {}/{} failed ({}), retrying in {:?}",
                    attempt, policy.max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: u32) -> StartupRetry {
        StartupRetry {
            max_attempts,
            base_interval_ms: 1,
            backoff_multiplier: 2,
            max_interval_ms: 4,
        }
    }

    #[test]
    fn test_backoff_default_policy() {
        let policy = StartupRetry::default();
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(100));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(200));
        assert_eq!(policy.calculate_backoff(4), Duration::from_millis(800));
        assert_eq!(policy.calculate_backoff(5), Duration::from_millis(1600));
        assert_eq!(policy.calculate_backoff(6), Duration::from_millis(2000));
        assert_eq!(policy.calculate_backoff(50), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        let policy = StartupRetry {
            max_attempts: 50,
            base_interval_ms: 10_000,
            backoff_multiplier: 10,
            max_interval_ms: u64::MAX,
        };
        assert_eq!(policy.calculate_backoff(50), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_validation() {
        assert!(StartupRetry::default().validate().is_ok());
        assert!(fast_policy(0).validate().is_err());
        let inverted = StartupRetry {
            base_interval_ms: 500,
            max_interval_ms: 100,
            ..StartupRetry::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(RetryPolicyError::MaxIntervalLessThanBase(100, 500))
        ));
    }

    fn refused() -> WorkerError {
        WorkerError::Transport {
            reason: "connection refused".to_string(),
        }
    }

    #[tokio::test]
    async fn test_retries_transport_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = retry_transport(&fast_policy(5), || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(refused())
                } else {
                    Ok(vec!["alpha".to_string()])
                }
            }
        })
        .await;

        assert_eq!(result, Ok(vec!["alpha".to_string()]));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = retry_transport(&fast_policy(3), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(refused())
            }
        })
        .await;

        assert!(matches!(result, Err(WorkerError::Transport { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_other_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = retry_transport(&fast_policy(5), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(WorkerError::Gone)
            }
        })
        .await;

        assert_eq!(result, Err(WorkerError::Gone));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
