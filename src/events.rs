//! In-process fan-out of alert payloads to live subscribers.
//!
//! Each subscriber owns an unbounded queue, so `publish` never waits on a
//! slow consumer. The registry lock is only held for insert/remove and for
//! the enqueue loop in `publish`; receiving happens outside it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

#[derive(Default)]
struct Registry {
    next_id: u64,
    senders: HashMap<u64, mpsc::UnboundedSender<String>>,
    closed: bool,
}

/// Publish/subscribe channel for string payloads.
///
/// Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    ///
    /// It receives every payload published from now on, and none before.
    /// After [`EventBus::close`] the returned subscriber is already finished.
    pub fn subscribe(&self) -> Subscriber {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        if !registry.closed {
            registry.senders.insert(id, tx);
        }

        Subscriber {
            id,
            rx,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Enqueue `payload` on every registered subscriber.
    ///
    /// Returns the number of subscribers it was delivered to.
    pub fn publish(&self, payload: impl Into<String>) -> usize {
        let payload = payload.into();
        let mut registry = self.lock();
        // A failed send means the receiving half is gone; drop it here.
        registry
            .senders
            .retain(|_, tx| tx.send(payload.clone()).is_ok());
        registry.senders.len()
    }

    /// Remove a subscriber. Dropping it has the same effect.
    pub fn unsubscribe(&self, subscriber: Subscriber) {
        drop(subscriber);
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().senders.len()
    }

    /// Drop every subscriber's sending half so their streams end, and refuse
    /// new registrations.
    pub fn close(&self) {
        let mut registry = self.lock();
        registry.closed = true;
        registry.senders.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        lock_registry(&self.registry)
    }
}

fn lock_registry(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // The registry holds no invariants a panicking holder could break.
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One live subscription. Unregisters itself when dropped.
pub struct Subscriber {
    id: u64,
    rx: mpsc::UnboundedReceiver<String>,
    registry: Arc<Mutex<Registry>>,
}

impl Subscriber {
    /// Wait for the next payload.
    ///
    /// Returns `None` once the bus has been closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take a payload if one is already queued.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        let mut registry = lock_registry(&self.registry);
        registry.senders.remove(&self.id);
        tracing::debug!(
            "Subscriber {} removed ({} live)",
            self.id,
            registry.senders.len()
        );
    }
}
