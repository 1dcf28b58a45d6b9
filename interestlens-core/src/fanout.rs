//! Bounded concurrency helpers for fanning out over items

use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::errors::{CoreError, Result};

/// Default number of concurrent collaborator calls
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Runs `f` over every item with at most `limit` futures in flight.
///
/// Results come back in input order. A `limit` of zero is treated as one.
pub async fn bounded_map<I, T, F, Fut>(items: I, limit: usize, f: F) -> Vec<T>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    let semaphore = Semaphore::new(limit.max(1));
    let semaphore = &semaphore;
    let f = &f;

    join_all(items.into_iter().map(|item| async move {
        // The semaphore is never closed, so acquiring cannot fail.
        let _permit = semaphore.acquire().await.ok();
        f(item).await
    }))
    .await
}

/// Awaits `fut`, failing with [`CoreError::Timeout`] once `duration` elapses
pub async fn with_timeout<T, Fut>(duration: Duration, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Timeout {
            seconds: duration.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_bounded_map_preserves_order() {
        let results = bounded_map(vec![30u64, 10, 20, 0], 4, |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        })
        .await;

        assert_eq!(results, vec![30, 10, 20, 0]);
    }

    #[tokio::test]
    async fn test_bounded_map_respects_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        bounded_map(0..12, 3, |_| {
            let active = active.clone();
            let peak = peak.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_with_timeout_elapsed() {
        let result: Result<()> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_with_timeout_passes_through() {
        let ok = with_timeout(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<u8> = with_timeout(Duration::from_secs(1), async {
            Err(CoreError::InvalidInput("bad".into()))
        })
        .await;
        assert!(matches!(err, Err(CoreError::InvalidInput(_))));
    }
}
