use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::error::{Error, Result};

/// The bounded exponential backoff every `MemStore` operation retries transient failures
/// under. Capped low because a single-process store has
/// nothing to wait out for long; a real distributed backend would tune this separately.
fn policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(200))
        .with_max_times(5)
}

/// Run `op`, retrying with bounded exponential backoff as long as it fails with
/// [`Error::Transient`]. Any other error returns immediately.
pub async fn with_backoff<T, F, Fut>(op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    op.retry(policy())
        .when(Error::is_transient)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_until_success() {
        let attempts = AtomicU32::new(0);
        let result = with_backoff(|| async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(Error::Transient("simulated".into()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = with_backoff(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(Error::NotFound("k".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
