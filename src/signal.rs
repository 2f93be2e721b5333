//! One-shot stop flag shared by every part of a session.
//!
//! `CancellationSignal` is a thin wrapper over tokio-util's
//! `CancellationToken` that only exposes the monotonic half of its API:
//! once cancelled it stays cancelled.

use tokio_util::sync::CancellationToken;

/// Shared, monotonic cancellation flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Calling it again has no further effect.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            log::debug!("Cancellation signalled");
        }
        self.token.cancel();
    }

    /// Non-blocking read of the flag.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the flag is set (immediately if it already is).
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_signal_starts_clear() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn test_cancel_is_idempotent_and_monotonic() {
        let signal = CancellationSignal::new();
        signal.cancel();
        assert!(signal.is_cancelled());
        signal.cancel();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = CancellationSignal::new();
        let observer = signal.clone();
        signal.cancel();
        assert!(observer.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let signal = CancellationSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .expect("task completes");
    }

    #[tokio::test]
    async fn test_cancelled_is_immediate_when_already_set() {
        let signal = CancellationSignal::new();
        signal.cancel();
        tokio::time::timeout(Duration::from_millis(10), signal.cancelled())
            .await
            .expect("already cancelled");
    }

    #[tokio::test]
    async fn test_concurrent_cancel_and_read() {
        let signal = CancellationSignal::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let s = signal.clone();
            handles.push(tokio::spawn(async move {
                s.cancel();
                s.is_cancelled()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert!(signal.is_cancelled());
    }
}
