//! Cooperative cancellation for long-running collection phases.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Cancellation handle shared between a collection run and its caller.
///
/// Clones observe the same underlying token. Cancellation is idempotent
/// and observable both synchronously ([`CancelToken::is_canceled`]) and
/// asynchronously ([`CancelToken::canceled`]).
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    flag: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.flag.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Resolve once the token is canceled.
    pub async fn canceled(&self) {
        loop {
            if self.is_canceled() {
                return;
            }
            let notified = self.inner.notify.notified();
            // Re-check after registering so a cancel between the load and
            // the registration is not missed.
            if self.is_canceled() {
                return;
            }
            notified.await;
        }
    }
}
