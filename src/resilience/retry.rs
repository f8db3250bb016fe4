// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry with exponential backoff for storage infrastructure calls.
//!
//! This covers transient database trouble only (connect, schema init,
//! individual statements). Event-level retry is the transport's job: a
//! moderation event that fails here still propagates to the caller once
//! the bounded attempts are exhausted, so nothing is ever silently
//! swallowed.
//!
//! # Example
//!
//! ```
//! use atlas_search::RetryConfig;
//!
//! // Startup: fail fast on bad connection strings
//! let startup = RetryConfig::startup();
//! assert_eq!(startup.max_retries, 5);
//!
//! // Query: quick retry, then hand the error to the caller
//! let query = RetryConfig::query();
//! assert_eq!(query.max_retries, 3);
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

/// Bounded retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub max_retries: usize,
}

impl RetryConfig {
    /// Fast-fail retry for initial startup connections.
    /// Five attempts with exponential backoff; a wrong connection string
    /// surfaces within seconds instead of hanging the process.
    #[must_use]
    pub fn startup() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
        }
    }

    /// Quick retry for individual statements. Three attempts with fast
    /// backoff; exhaustion propagates to the caller.
    #[must_use]
    pub fn query() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
        }
    }

    /// Minimal delays for tests
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
        }
    }
}

pub async fn retry<F, Fut, T, E>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if attempts > 0 {
                    info!(
                        operation = operation_name,
                        attempts, "Operation succeeded after retries"
                    );
                }
                return Ok(val);
            }
            Err(err) => {
                attempts += 1;
                if attempts >= config.max_retries {
                    return Err(err);
                }

                warn!(
                    operation = operation_name,
                    attempt = attempts,
                    max = config.max_retries,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "Operation failed, retrying"
                );

                sleep(delay).await;
                delay = delay.mul_f64(config.factor).min(config.max_delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError(String);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let result: Result<i32, TestError> =
            retry("op", &RetryConfig::test(), || async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<i32, TestError> = retry("op", &RetryConfig::test(), || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) + 1 < 3 {
                    Err(TestError("transient".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<i32, TestError> = retry("op", &RetryConfig::test(), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TestError("always".into()))
            }
        })
        .await;

        assert!(result.unwrap_err().0.contains("always"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_caps_at_max_delay() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            factor: 10.0,
            max_retries: 5,
        };

        let delay = config
            .initial_delay
            .mul_f64(config.factor)
            .min(config.max_delay);
        assert_eq!(delay, Duration::from_secs(5));
    }
}
