//! Retry with a fixed, cancellable delay

use crate::context::FetchContext;
use crate::error::{Error, FetchError, Result};
use log::trace;
use std::future::Future;
use std::time::Duration;

/// How often and how patiently to retry one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; zero is treated as one
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Run `op` until it succeeds or the attempts run out
///
/// Each attempt races the context, and so does the delay between attempts, so
/// a cancelled or expired context ends the loop immediately with the matching
/// cancellation error. `on_retry` is called with the 1-based attempt number
/// whenever another attempt will follow. The last failure is wrapped in
/// [`FetchError::RetriesExhausted`].
pub async fn fetch_with_retry<T, F, Fut, R>(
    ctx: &FetchContext,
    policy: RetryPolicy,
    operation: &str,
    mut on_retry: R,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    R: FnMut(u32, &Error),
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        ctx.check()?;

        let error = match ctx.run(op()).await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_cancellation() => return Err(error),
            Err(error) => error,
        };

        if attempt >= attempts {
            return Err(FetchError::retries_exhausted(operation, attempts, error).into());
        }

        on_retry(attempt, &error);
        trace!("{operation} retrying in {:?} after attempt {attempt}", policy.delay);

        tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(ctx.cancellation_error().into()),
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy(max_attempts: u32, delay_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(delay_ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let mut retries = Vec::new();

        let value = fetch_with_retry(
            &FetchContext::background(),
            policy(3, 100),
            "get_wan_info",
            |attempt, _| retries.push(attempt),
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RemoteError::network("get_wan_info", "reset").into())
                } else {
                    Ok(7)
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(retries, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_wraps_last_error() {
        let calls = AtomicU32::new(0);

        let error = fetch_with_retry(
            &FetchContext::background(),
            policy(3, 10),
            "get_device_list",
            |_, _| {},
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(RemoteError::api("get_device_list", 1629, "busy").into())
            },
        )
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match error {
            Error::Fetch(FetchError::RetriesExhausted {
                operation,
                attempts,
                source,
            }) => {
                assert_eq!(operation, "get_device_list");
                assert_eq!(attempts, 3);
                assert!(matches!(*source, Error::Remote(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_delay() {
        let (ctx, handle) = FetchContext::background().with_cancel();
        let start = Instant::now();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let error = fetch_with_retry(
            &ctx,
            policy(3, 5_000),
            "get_system_status",
            |_, _| {},
            || async { Err::<(), _>(RemoteError::network("get_system_status", "down").into()) },
        )
        .await
        .unwrap_err();

        assert!(matches!(error, Error::Fetch(FetchError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(5));
        canceller.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_slow_attempt() {
        let ctx = FetchContext::background().with_timeout(Duration::from_millis(50));

        let error = fetch_with_retry(&ctx, policy(3, 10), "get_wifi_details", |_, _| {}, || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(error, Error::Fetch(FetchError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let calls = AtomicU32::new(0);
        let result = fetch_with_retry(
            &FetchContext::background(),
            policy(0, 0),
            "get_wan_info",
            |_, _| {},
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
