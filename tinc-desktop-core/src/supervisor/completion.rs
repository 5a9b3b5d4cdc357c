//! Broadcast-once completion signal
//!
//! Fired exactly once when a worker terminates, observable by any number
//! of waiters, and carrying the captured termination error.

use crate::error::TerminationError;
use std::sync::Arc;
use tokio::sync::watch;

/// Outcome stored once the signal fires; `None` means a clean exit
type Outcome = Option<TerminationError>;

/// Single-fire completion signal
///
/// Clones share the same underlying state.
#[derive(Debug, Clone)]
pub struct Completion {
    state: Arc<watch::Sender<Option<Outcome>>>,
}

impl Completion {
    /// Create an unfired signal
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state: Arc::new(state),
        }
    }

    /// Fire the signal with the worker's outcome
    ///
    /// Returns `true` for the call that actually fired it. Every later call
    /// is ignored and returns `false`, so the first outcome wins.
    pub fn fire(&self, outcome: Outcome) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(outcome);
            true
        })
    }

    /// Whether the signal has fired
    pub fn is_fired(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Wait until the signal fires
    ///
    /// Returns immediately when it already has.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|state| state.is_some()).await;
    }

    /// Captured termination error
    ///
    /// Only meaningful after the signal fired; before that it is `None`.
    pub fn termination_error(&self) -> Option<TerminationError> {
        self.state.borrow().clone().flatten()
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fires_once() {
        let completion = Completion::new();
        assert!(!completion.is_fired());

        assert!(completion.fire(Some(TerminationError::ExitStatus { code: 3 })));
        assert!(!completion.fire(None));

        assert!(completion.is_fired());
        assert_eq!(
            completion.termination_error(),
            Some(TerminationError::ExitStatus { code: 3 })
        );
    }

    #[test]
    fn test_clean_outcome_has_no_error() {
        let completion = Completion::new();
        completion.fire(None);
        assert!(completion.is_fired());
        assert_eq!(completion.termination_error(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_all_waiters_observe_fire() {
        let completion = Completion::new();

        let waiters: Vec<_> = (0..16)
            .map(|_| {
                let completion = completion.clone();
                tokio::spawn(async move {
                    completion.wait().await;
                    completion.termination_error()
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        completion.fire(Some(TerminationError::Signalled));

        for waiter in waiters {
            let seen = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should wake")
                .unwrap();
            assert_eq!(seen, Some(TerminationError::Signalled));
        }
    }

    #[tokio::test]
    async fn test_wait_after_fire_returns_immediately() {
        let completion = Completion::new();
        completion.fire(None);
        tokio::time::timeout(Duration::from_millis(100), completion.wait())
            .await
            .expect("already fired");
    }
}
