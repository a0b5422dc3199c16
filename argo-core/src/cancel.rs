//! Cancellation for a build run
//!
//! A [`CancelToken`] is handed to every external call a run makes (HTTP
//! requests, registry login, image build) so an abort signal received by the
//! process interrupts whatever is in flight. The token never cancels by
//! itself; only its [`CancelHandle`] does.

use tokio::sync::watch;

/// Sending half: triggers cancellation
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Receiving half: observed by in-flight operations
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Creates a linked handle/token pair
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    /// Requests cancellation of every operation holding a linked token
    pub fn cancel(&self) {
        // ignore send error: every token may already be dropped
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (_, token) = cancel_pair();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested
    ///
    /// Pends forever when the handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
