//! Deadline and cancellation propagation
//!
//! A [`FetchContext`] is threaded through a fetch round, every retry attempt,
//! and every call into the [`RouterClient`](crate::client::RouterClient). It
//! fires when its deadline passes or when any of its cancel handles is
//! triggered, whichever comes first.

use crate::error::{FetchError, Result};
use futures::future::select_all;
use std::future::{Future, pending};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// Cloneable deadline/cancellation token
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    deadline: Option<Instant>,
    signals: Vec<watch::Receiver<bool>>,
}

/// Owner side of a cancellation signal
///
/// Dropping the handle does not cancel the context.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel every context derived from this handle
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether `cancel` has been called
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl FetchContext {
    /// A context that never fires on its own
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context whose deadline is at most `timeout` from now
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context with an absolute deadline; an earlier parent deadline wins
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        Self {
            deadline: Some(deadline),
            signals: self.signals.clone(),
        }
    }

    /// Derive a cancellable context
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let mut signals = self.signals.clone();
        signals.push(rx);
        (
            Self {
                deadline: self.deadline,
                signals,
            },
            CancelHandle { tx },
        )
    }

    /// The effective deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    fn signalled(&self) -> bool {
        self.signals.iter().any(|rx| *rx.borrow())
    }

    fn deadline_passed(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Whether the context has fired
    pub fn is_cancelled(&self) -> bool {
        self.signalled() || self.deadline_passed()
    }

    /// `Ok(())` while the context is live, otherwise the matching fetch error
    pub fn check(&self) -> Result<()> {
        if self.signalled() {
            Err(FetchError::Cancelled.into())
        } else if self.deadline_passed() {
            Err(FetchError::DeadlineExceeded.into())
        } else {
            Ok(())
        }
    }

    /// The error describing why the context fired
    pub fn cancellation_error(&self) -> FetchError {
        if self.signalled() {
            FetchError::Cancelled
        } else {
            FetchError::DeadlineExceeded
        }
    }

    /// Resolve once the deadline passes or a cancel handle fires
    pub async fn cancelled(&self) {
        let deadline = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        let signal = async {
            if self.signals.is_empty() {
                return pending::<()>().await;
            }
            let waits = self
                .signals
                .iter()
                .cloned()
                .map(|rx| Box::pin(wait_for_cancel(rx)));
            select_all(waits).await;
        };

        tokio::select! {
            _ = deadline => {}
            _ = signal => {}
        }
    }

    /// Run `fut` unless the context fires first
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            result = fut => result,
            _ = self.cancelled() => Err(self.cancellation_error().into()),
        }
    }
}

/// Resolve once a shutdown flag is set or its sender is gone
///
/// Resolves to `()` so the borrowed value never outlives the wait.
pub(crate) async fn wait_stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}

async fn wait_for_cancel(mut rx: watch::Receiver<bool>) {
    // A dropped handle without a prior cancel never fires
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_background_context_is_live() {
        let ctx = FetchContext::background();
        assert!(!ctx.is_cancelled());
        assert!(ctx.check().is_ok());
        assert!(ctx.remaining().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let ctx = FetchContext::background().with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_cancelled());

        let start = Instant::now();
        ctx.cancelled().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(ctx.is_cancelled());
        assert!(matches!(
            ctx.check(),
            Err(Error::Fetch(FetchError::DeadlineExceeded))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_deadline_never_extends_parent() {
        let parent = FetchContext::background().with_timeout(Duration::from_millis(10));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test]
    async fn test_cancel_handle_fires_children() {
        let (ctx, handle) = FetchContext::background().with_cancel();
        let (child, _child_handle) = ctx.with_cancel();

        let waiter = tokio::spawn(async move {
            child.cancelled().await;
            child.check()
        });

        handle.cancel();
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(Error::Fetch(FetchError::Cancelled))));
        assert!(handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_does_not_cancel() {
        let (ctx, handle) = FetchContext::background().with_cancel();
        drop(handle);

        let fired = tokio::time::timeout(Duration::from_secs(1), ctx.cancelled()).await;
        assert!(fired.is_err());
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_aborts_slow_future() {
        let ctx = FetchContext::background().with_timeout(Duration::from_millis(20));
        let result: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(
            result,
            Err(Error::Fetch(FetchError::DeadlineExceeded))
        ));
    }
}
