//! Caller-side retry wrapper.
//!
//! The client itself never retries: a failed send may or may not have reached
//! the service, and repeating it could post the message twice. Callers that
//! know an operation is safe to repeat (history fetches, for instance) wrap it
//! here.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::Result;

/// Run `operation`, retrying after each delay in `delays` while the error is
/// [retryable](crate::error::PlaylabError::is_retryable).
///
/// Makes at most `delays.len() + 1` attempts. Non-retryable errors are
/// returned immediately.
pub async fn retry_with_backoff<F, Fut, T>(mut operation: F, delays: &[Duration]) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total = delays.len() + 1;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < total => {
                let delay = delays[attempt - 1];
                warn!(
                    "Request failed (attempt {}/{}): {e}. Retrying after {:?}...",
                    attempt, total, delay
                );
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// The first `retries` delays of a backoff schedule given in milliseconds.
pub fn backoff_schedule(schedule_ms: &[u64], retries: usize) -> Vec<Duration> {
    schedule_ms
        .iter()
        .copied()
        .chain(std::iter::repeat(schedule_ms.last().copied().unwrap_or(0)))
        .take(retries)
        .map(Duration::from_millis)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaylabError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// A real transport failure: nothing listens on the discard port locally.
    async fn network_error() -> PlaylabError {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:9/")
            .send()
            .await
            .expect_err("connection should be refused");
        PlaylabError::Network {
            operation: "test",
            source: err,
        }
    }

    const FAST: &[Duration] = &[Duration::from_millis(1), Duration::from_millis(1)];

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, PlaylabError>(7)
                }
            },
            FAST,
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_network_errors_then_succeeds() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(network_error().await)
                    } else {
                        Ok(n)
                    }
                }
            },
            FAST,
        )
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_schedule() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: Result<()> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(network_error().await)
                }
            },
            FAST,
        )
        .await;
        assert!(matches!(result, Err(PlaylabError::Network { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_other_errors() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: Result<()> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(PlaylabError::Auth("bad key".into()))
                }
            },
            FAST,
        )
        .await;
        assert!(matches!(result, Err(PlaylabError::Auth(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn schedule_extends_with_last_delay() {
        let d = backoff_schedule(&[100, 200], 4);
        assert_eq!(
            d,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(200),
                Duration::from_millis(200),
            ]
        );
        assert!(backoff_schedule(&[100], 0).is_empty());
        assert_eq!(backoff_schedule(&[], 2), vec![Duration::ZERO, Duration::ZERO]);
    }
}
