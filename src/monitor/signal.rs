//! Observable values published by the monitor.

use std::sync::Arc;
use tokio::sync::watch;

/// A value the monitor publishes and anyone can read or subscribe to.
///
/// Clones share the same underlying channel. Only the crate writes.
#[derive(Debug, Clone)]
pub struct Signal<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq,
{
    pub(crate) fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// A receiver that is notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Wait until the signal holds `value`. Returns immediately if it already does.
    pub async fn wait_for(&self, value: T) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|current| *current == value).await;
    }

    /// Publish a value. Subscribers are only woken when it differs.
    pub(crate) fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }
}
