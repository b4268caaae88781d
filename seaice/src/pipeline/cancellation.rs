//! Cooperative cancellation for pipeline runs.
//!
//! The runner checks the token between stages only. A stage that has
//! started always runs to completion, so the labeler never leaves a grid
//! half relabeled.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Token for requesting that a run stop at the next stage boundary.
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.cancelled.load(Ordering::SeqCst))
            .field("reason", &self.reason.lock())
            .finish()
    }
}

impl CancellationToken {
    /// Creates a new shared cancellation token.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason if cancelled.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    /// Requests cancellation. Only the first reason is kept.
    pub fn cancel(&self, reason: impl Into<String>) {
        let mut slot = self.reason.lock();
        if slot.is_none() {
            *slot = Some(reason.into());
        }
        // The reason must be visible before anyone observes the flag.
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            reason: Mutex::new(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_reason_wins() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert_eq!(token.reason(), None);

        token.cancel("operator abort");
        token.cancel("second request");

        assert!(token.is_cancelled());
        assert_eq!(token.reason().as_deref(), Some("operator abort"));
    }

    #[test]
    fn test_reason_is_set_whenever_cancelled() {
        for _ in 0..200 {
            let token = CancellationToken::new();
            let remote = Arc::clone(&token);
            let canceller = std::thread::spawn(move || remote.cancel("shutdown"));

            while !token.is_cancelled() {
                std::hint::spin_loop();
            }
            assert_eq!(token.reason().as_deref(), Some("shutdown"));
            canceller.join().unwrap();
        }
    }

    #[test]
    fn test_shared_across_threads() {
        let token = CancellationToken::new();
        let remote = Arc::clone(&token);

        std::thread::spawn(move || remote.cancel("shutdown"))
            .join()
            .unwrap();

        assert!(token.is_cancelled());
    }
}
