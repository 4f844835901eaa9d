//! Server-wide closed flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Closed flag shared between a server handle and its acceptor.
///
/// The flag is the source of truth; the watch channel only wakes an
/// acceptor that is parked in `accept`.
#[derive(Debug, Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    closed: AtomicBool,
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create an open (not closed) flag.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                closed: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Subscribe to the close wakeup.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.tx.subscribe()
    }

    /// Set the closed flag. Returns `true` for the call that closed it.
    pub fn trigger(&self) -> bool {
        let first = !self.inner.closed.swap(true, Ordering::SeqCst);
        if first {
            self.inner.tx.send_replace(true);
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
