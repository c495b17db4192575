//! Bounded retry for empty responses.
//!
//! The GraphQL endpoint occasionally answers a page query with no data at all.
//! That case is retried a fixed number of times with a fixed delay; real
//! errors are passed straight through to the caller.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};

use crate::download::{DEFAULT_EMPTY_RETRIES, DEFAULT_EMPTY_RETRY_DELAY_SECS};
use crate::platform::PlatformError;

/// Configuration for empty-response retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay between attempts.
    pub delay: Duration,
    /// Retries after the first attempt.
    pub max_retries: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(DEFAULT_EMPTY_RETRY_DELAY_SECS),
            max_retries: DEFAULT_EMPTY_RETRIES,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(delay: Duration, max_retries: usize) -> Self {
        Self { delay, max_retries }
    }

    /// Build a constant backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_retries)
    }
}

#[derive(Debug)]
enum Attempt {
    Empty,
    Failed(PlatformError),
}

/// Run `operation` until it yields a value, retrying while it yields `None`.
///
/// Returns `Ok(None)` once the retries are used up, or as soon as `should_stop`
/// reports true after an empty attempt. Errors are never retried. `on_retry`
/// receives the attempt number that came back empty and the delay before the
/// next one.
///
/// # Example
///
/// ```ignore
/// let page = retry_empty(
///     || client.items_page(&repo, "bug", ItemKind::Issue, 100, None),
///     RetryConfig::default(),
///     || false,
///     |attempt, delay| tracing::debug!(attempt, ?delay, "empty page"),
/// )
/// .await?;
/// ```
pub async fn retry_empty<T, F, Fut, S, N>(
    mut operation: F,
    config: RetryConfig,
    should_stop: S,
    on_retry: N,
) -> Result<Option<T>, PlatformError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, PlatformError>>,
    S: Fn() -> bool,
    N: Fn(u32, Duration),
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        let fut = operation();
        async move {
            match fut.await {
                Ok(Some(value)) => Ok(value),
                Ok(None) => Err(Attempt::Empty),
                Err(e) => Err(Attempt::Failed(e)),
            }
        }
    };

    let result = retry_op
        .retry(config.into_backoff())
        .notify(|_, dur| on_retry(attempt.load(Ordering::SeqCst), dur))
        .when(|e| matches!(e, Attempt::Empty) && !should_stop())
        .await;

    match result {
        Ok(value) => Ok(Some(value)),
        Err(Attempt::Empty) => Ok(None),
        Err(Attempt::Failed(e)) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.delay, Duration::from_secs(5));
        assert_eq!(config.max_retries, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_empty_gives_up_after_bound() {
        let calls = Arc::new(AtomicU32::new(0));
        let notified: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

        let calls_capture = Arc::clone(&calls);
        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                Ok::<Option<u32>, PlatformError>(None)
            }
        };

        let start = tokio::time::Instant::now();
        let notified_capture = Arc::clone(&notified);
        let result = retry_empty(operation, RetryConfig::default(), || false, move |attempt, _| {
            notified_capture
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(attempt);
        })
        .await;

        assert_eq!(result.unwrap(), None);
        // First attempt plus five retries, five seconds apart.
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert!(start.elapsed() >= Duration::from_secs(25));
        assert_eq!(
            *notified.lock().unwrap_or_else(|e| e.into_inner()),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_empty_returns_value_after_empty_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);
        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                let n = calls_capture.fetch_add(1, Ordering::SeqCst);
                Ok::<_, PlatformError>(if n < 2 { None } else { Some(42u32) })
            }
        };

        let result = retry_empty(operation, RetryConfig::default(), || false, |_, _| {}).await;

        assert_eq!(result.unwrap(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_empty_does_not_retry_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);
        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                Err::<Option<u32>, _>(PlatformError::api("boom"))
            }
        };

        let err = retry_empty(operation, RetryConfig::default(), || false, |_, _| {})
            .await
            .expect_err("expected error");

        assert!(err.to_string().contains("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_empty_stops_when_requested() {
        let calls = Arc::new(AtomicU32::new(0));
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let calls_capture = Arc::clone(&calls);
        let stop_capture = Arc::clone(&stop);
        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            let stop_capture = Arc::clone(&stop_capture);
            async move {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                stop_capture.store(true, Ordering::SeqCst);
                Ok::<Option<u32>, PlatformError>(None)
            }
        };

        let start = tokio::time::Instant::now();
        let result = retry_empty(
            operation,
            RetryConfig::default(),
            || stop.load(Ordering::SeqCst),
            |_, _| {},
        )
        .await;

        assert_eq!(result.unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
