//! Cooperative cancellation for kernel runs.
//!
//! A [`CancellationTokenSource`] owns the cancellation state; the
//! [`CancellationToken`]s it hands out observe it. The kernel polls its token
//! between steps and treats cancellation like an interrupt: the current step
//! is marked interrupted, no later step runs, finalizers still run.
//!
//! A step in flight is never preempted. Long-running steps can poll the same
//! token themselves or race their work against [`CancellationToken::cancelled`].
//!
//! # Example
//!
//! ```ignore
//! use cellkit_kernel::workflow::CancellationTokenSource;
//!
//! let source = CancellationTokenSource::new();
//! let kernel = Kernel::new(definition, log).with_cancellation_token(source.token());
//!
//! // elsewhere
//! source.cancel();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Thread-safe cancellation token.
///
/// Clones share the same state.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Returns true if the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once the token is cancelled.
    ///
    /// # Use with tokio::select!
    ///
    /// ```ignore
    /// tokio::select! {
    ///     _ = token.cancelled() => Err(StepError::Cancelled("shutdown".into())),
    ///     rows = fetch_rows() => Ok(json!(rows)),
    /// }
    /// ```
    pub async fn cancelled(&self) {
        loop {
            // register before checking so a concurrent cancel() is not missed
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Owner of a cancellation token.
#[derive(Clone, Debug)]
pub struct CancellationTokenSource {
    token: CancellationToken,
}

impl CancellationTokenSource {
    /// Creates a new source with a fresh token.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Returns a token observing this source.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancels the token and wakes every waiter. Idempotent.
    pub fn cancel(&self) {
        self.token.cancelled.store(true, Ordering::SeqCst);
        self.token.notify.notify_waiters();
    }

    /// Returns true if [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for CancellationTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_token_initially_not_cancelled() {
        let source = CancellationTokenSource::new();
        assert!(!source.token().is_cancelled());
        assert!(!source.is_cancelled());
    }

    #[test]
    fn test_token_clone_shares_state() {
        let source = CancellationTokenSource::new();
        let token1 = source.token();
        let token2 = token1.clone();

        source.cancel();
        source.cancel();

        assert!(token1.is_cancelled());
        assert!(token2.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let source = CancellationTokenSource::new();
        let token = source.token();

        let waiter = tokio::spawn(async move {
            token.cancelled().await;
            true
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        source.cancel();

        let woke = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(woke, Ok(Ok(true))));
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_already_cancelled() {
        let source = CancellationTokenSource::new();
        source.cancel();
        let done = tokio::time::timeout(Duration::from_millis(100), source.token().cancelled()).await;
        assert!(done.is_ok());
    }
}
