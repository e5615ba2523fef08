// Cooperative cancellation for background tasks.
//
// A CancelToken is a shared monotonic flag: once set it stays set. The running
// engine polls it between sub-steps; the submitter flips it from the UI thread.
// There is no forced termination anywhere - an engine that never polls simply
// runs to completion.

use crate::engine::EngineError;
use tokio::sync::watch;

/// Shared cancellation flag for one in-flight task.
///
/// Cloning produces another handle to the same flag. [`cancel()`](Self::cancel)
/// is idempotent and may be called from any thread; the flag never resets.
///
/// Two observation modes are offered:
/// - [`is_cancelled()`](Self::is_cancelled) for synchronous polling inside
///   engine code (the polling interval convention is a few hundred
///   milliseconds at most for long operations)
/// - [`cancelled()`](Self::cancelled) for awaiting the flag, used by the
///   worker wrapper to abort tasks that are still queued for a pool slot
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    /// Request cancellation. Safe to call repeatedly and from any thread;
    /// after the first call the observable state is permanently "cancelled".
    pub fn cancel(&self) {
        let was_cancelled = self.tx.send_replace(true);
        if !was_cancelled {
            tracing::debug!("cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the token has been cancelled. Returns immediately when
    /// the flag is already set.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so wait_for can only fail if that is gone.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Polling helper for engine code: `token.bail_if_cancelled()?` between
    /// sub-steps.
    pub fn bail_if_cancelled(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fresh_token_is_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.bail_if_cancelled().is_ok());
    }

    #[test]
    fn test_cancel_is_monotonic() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());

        // No reset exists; the flag stays set.
        token.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(
            token.bail_if_cancelled(),
            Err(EngineError::Cancelled)
        ));
    }

    #[test]
    fn test_clones_share_the_flag() {
        let token = CancelToken::new();
        let other = token.clone();

        other.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .expect("waiter should wake after cancel")
            .expect("waiter task panicked");
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_already_set() {
        let token = CancelToken::new();
        token.cancel();

        tokio::time::timeout(Duration::from_millis(50), token.cancelled())
            .await
            .expect("already-cancelled token should resolve immediately");
    }

    #[test]
    fn test_cancel_from_other_thread() {
        let token = CancelToken::new();
        let other = token.clone();

        std::thread::spawn(move || other.cancel()).join().unwrap();
        assert!(token.is_cancelled());
    }
}
