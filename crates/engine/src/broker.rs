//! In-process synchronization broker.
//!
//! Decouples state mutation from state observation: independently-rendered
//! consumers (a doctor's shipment view, a logistics queue) register a
//! handler and converge on the same entity state without polling each
//! other. The broker holds no entity state and pushes no payloads — a
//! notification means "something changed", and the subscriber re-reads
//! through the service's snapshot surface. That keeps a slow subscriber
//! from ever acting on a stale pushed payload.
//!
//! Fan-out is synchronous: every handler registered at commit time runs
//! before the mutating call returns. This is an in-process guarantee only;
//! a multi-instance deployment needs a durable event log in place of this
//! broker.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type ChangeHandler = Arc<dyn Fn() + Send + Sync>;

/// Token returned by [`ChangeBroker::subscribe`]; pass it back to
/// [`ChangeBroker::unsubscribe`] to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberToken(u64);

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    handlers: Mutex<BTreeMap<u64, ChangeHandler>>,
}

/// Clonable handle over a shared subscriber registry.
///
/// Clones share the registry, so the same broker can be handed to the
/// service and to any number of consumers.
#[derive(Clone, Default)]
pub struct ChangeBroker {
    inner: Arc<Inner>,
}

impl ChangeBroker {
    pub fn new() -> Self {
        ChangeBroker::default()
    }

    /// Register a zero-argument handler invoked after every committed
    /// mutation to any entity.
    pub fn subscribe(&self, handler: impl Fn() + Send + Sync + 'static) -> SubscriberToken {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_handlers().insert(id, Arc::new(handler));
        SubscriberToken(id)
    }

    /// Deregister a handler. Returns `false` if the token was already
    /// removed.
    pub fn unsubscribe(&self, token: &SubscriberToken) -> bool {
        self.lock_handlers().remove(&token.0).is_some()
    }

    /// Number of currently-registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock_handlers().len()
    }

    /// Synchronous fan-out to every registered handler. Internal: only the
    /// service calls this, after a successful commit.
    ///
    /// Handlers run outside the registry lock, so a handler may subscribe,
    /// unsubscribe, or call back into the service.
    pub(crate) fn notify(&self) {
        let handlers: Vec<ChangeHandler> = self.lock_handlers().values().cloned().collect();
        tracing::debug!(subscribers = handlers.len(), "change fan-out");
        for handler in handlers {
            handler();
        }
    }

    fn lock_handlers(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, ChangeHandler>> {
        // Registry mutations are single map ops; a poisoned lock cannot
        // leave the map inconsistent.
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}
