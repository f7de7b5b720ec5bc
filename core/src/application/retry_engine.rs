// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Retry Engine (spec §4.8): exponential backoff with multiplicative
//! jitter, short-circuiting on non-retryable error kinds.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::domain::ErrorKind;

#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            factor: 2.0,
        }
    }
}

fn delay_for_attempt(opts: &RetryOptions, attempt: u32) -> Duration {
    let raw = opts.base_delay.as_millis() as f64 * opts.factor.powi(attempt as i32);
    let capped = raw.min(opts.max_delay.as_millis() as f64);
    let jitter = rand::rng().random_range(0.5..1.0);
    Duration::from_millis((capped * jitter) as u64)
}

/// Retries `attempt` (1-indexed) up to `opts.max_retries + 1` total
/// calls. `classify` extracts the `ErrorKind` from a failure so the
/// engine can honor the non-retryable set without owning the error type.
pub async fn retry_with_backoff<F, Fut, T, E>(opts: &RetryOptions, mut attempt_fn: F, classify: impl Fn(&E) -> ErrorKind, mut on_retry: impl FnMut(&E, u32)) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retryable = classify(&err).is_retryable();
                if !retryable || attempt >= opts.max_retries {
                    return Err(err);
                }
                on_retry(&err, attempt + 1);
                tokio::time::sleep(delay_for_attempt(opts, attempt)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_retryable_errors_up_to_max_plus_one_attempts() {
        let calls = AtomicU32::new(0);
        let opts = RetryOptions { max_retries: 2, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5), factor: 2.0 };
        let result: Result<(), ErrorKind> = retry_with_backoff(
            &opts,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ErrorKind::UpstreamError) }
            },
            |e| *e,
            |_, _| {},
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn timeout_is_not_retried() {
        let calls = AtomicU32::new(0);
        let opts = RetryOptions::default();
        let result: Result<(), ErrorKind> = retry_with_backoff(
            &opts,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ErrorKind::Timeout) }
            },
            |e| *e,
            |_, _| {},
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_retryable_errors_attempt_exactly_once() {
        let calls = AtomicU32::new(0);
        let opts = RetryOptions::default();
        let result: Result<(), ErrorKind> = retry_with_backoff(
            &opts,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ErrorKind::PolicyDenied) }
            },
            |e| *e,
            |_, _| {},
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
