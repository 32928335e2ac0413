//! Cooperative cancellation for conversation turns.
//!
//! A [`CancellationToken`] is created per turn and passed explicitly to every
//! stage that may suspend. Nothing is preempted: each loop boundary and each tool
//! execution checks the token before proceeding, and stream reads race against
//! [`CancellationToken::cancelled`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::{CancellationToken as Notifier, WaitForCancellationFuture};

use crate::error::{CourierError, Result};

type Listener = Box<dyn FnOnce() + Send>;

struct Inner {
    cancelled: AtomicBool,
    listeners: Mutex<Vec<Listener>>,
    notifier: Notifier,
}

/// Shareable, monotonic cancellation signal with fire-once listeners.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                listeners: Mutex::new(Vec::new()),
                notifier: Notifier::new(),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel the token. Only the first call has any effect.
    pub fn cancel(&self) {
        let listeners = {
            let mut listeners = self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if self.inner.cancelled.swap(true, Ordering::SeqCst) {
                return;
            }
            std::mem::take(&mut *listeners)
        };

        // Release waiters first; listeners may panic.
        self.inner.notifier.cancel();
        tracing::debug!(listeners = listeners.len(), "cancellation requested");
        for listener in listeners {
            listener();
        }
    }

    /// Return [`CourierError::Cancelled`] if the token has been cancelled.
    pub fn throw_if_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(CourierError::Cancelled);
        }
        Ok(())
    }

    /// Register a listener. Runs immediately when already cancelled.
    pub fn on_cancel<F>(&self, listener: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut listeners = self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if !self.is_cancelled() {
                listeners.push(Box::new(listener));
                return;
            }
        }
        listener();
    }

    /// Resolves once the token is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.inner.notifier.cancelled()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
