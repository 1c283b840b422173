//! Subscriber registry for connection events.
//!
//! Callbacks are grouped by [`EventKind`] and invoked in registration
//! order on the driver task. A panicking callback is logged and skipped;
//! the remaining subscribers for that event still run.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{error, trace};

use crate::domain::connection::{ConnectionEvent, EventKind};

/// A subscriber callback.
pub type Callback = Arc<dyn Fn(&ConnectionEvent) + Send + Sync>;

#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<EventKind, Vec<(u64, Callback)>>>,
}

impl SubscriberRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `kind` and return its handle.
    pub fn subscribe(self: &Arc<Self>, kind: EventKind, callback: Callback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .entry(kind)
            .or_default()
            .push((id, callback));
        trace!(kind = %kind, subscriber = id, "Subscriber registered");

        Subscription {
            target: Some((Arc::downgrade(self), kind, id)),
            active: AtomicBool::new(true),
        }
    }

    fn remove(&self, kind: EventKind, id: u64) {
        let mut subscribers = self.subscribers.lock();
        if let Some(list) = subscribers.get_mut(&kind) {
            list.retain(|(existing, _)| *existing != id);
            if list.is_empty() {
                subscribers.remove(&kind);
            }
        }
    }

    /// Number of callbacks registered for `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.subscribers.lock().get(&kind).map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.subscribers.lock().clear();
    }

    /// Deliver `event` to every subscriber of its kind.
    ///
    /// Returns the number of callbacks that completed without panicking.
    pub fn emit(&self, event: &ConnectionEvent) -> usize {
        let kind = event.kind();
        // Snapshot so callbacks may (un)subscribe without deadlocking.
        let callbacks: Vec<(u64, Callback)> = self
            .subscribers
            .lock()
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let mut delivered = 0;
        for (id, callback) in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_string());
                    error!(kind = %kind, subscriber = id, panic = %message, "Subscriber panicked");
                }
            }
        }
        delivered
    }
}

/// Handle returned by `subscribe`.
///
/// [`unsubscribe`](Self::unsubscribe) is idempotent. Dropping the handle
/// does not unsubscribe.
pub struct Subscription {
    target: Option<(Weak<SubscriberRegistry>, EventKind, u64)>,
    active: AtomicBool,
}

impl Subscription {
    /// A handle that was never registered. Unsubscribing it does nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            target: None,
            active: AtomicBool::new(false),
        }
    }

    /// Stop delivering events to this callback.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some((registry, kind, id)) = &self.target {
            if let Some(registry) = registry.upgrade() {
                registry.remove(*kind, *id);
            }
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Kind this handle is registered for, if any.
    #[must_use]
    pub fn kind(&self) -> Option<EventKind> {
        self.target.as_ref().map(|(_, kind, _)| *kind)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionError;
    use std::sync::atomic::AtomicUsize;

    fn error_event() -> ConnectionEvent {
        ConnectionEvent::Error(ConnectionError::Parse("bad".into()))
    }

    fn counter(registry: &Arc<SubscriberRegistry>, kind: EventKind) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let sub = registry.subscribe(
            kind,
            Arc::new(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (hits, sub)
    }

    #[test]
    fn events_reach_only_matching_kind() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (errors, _e) = counter(&registry, EventKind::Error);
        let (metrics, _m) = counter(&registry, EventKind::Metric);

        registry.emit(&error_event());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (hits, sub) = counter(&registry, EventKind::Error);
        let (other, _keep) = counter(&registry, EventKind::Error);

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(registry.count(EventKind::Error), 1);

        registry.emit(&error_event());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(other.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (before, _b) = counter(&registry, EventKind::Error);
        let _boom = registry.subscribe(EventKind::Error, Arc::new(|_| panic!("subscriber bug")));
        let (after, _a) = counter(&registry, EventKind::Error);

        assert_eq!(registry.emit(&error_event()), 2);
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        let registry = Arc::new(SubscriberRegistry::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Vec::new();
        for i in 0..3 {
            let order = order.clone();
            subs.push(registry.subscribe(
                EventKind::Error,
                Arc::new(move |_| order.lock().push(i)),
            ));
        }
        registry.emit(&error_event());
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn noop_handle_is_inert() {
        let sub = Subscription::noop();
        assert!(!sub.is_active());
        assert_eq!(sub.kind(), None);
        sub.unsubscribe();
    }

    #[test]
    fn handle_outliving_registry_is_harmless() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (_hits, sub) = counter(&registry, EventKind::Metric);
        drop(registry);
        sub.unsubscribe();
    }
}
