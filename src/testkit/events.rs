//! Capture of connection events for assertions.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::application::connection::{ConnectionManager, Subscription};
use crate::domain::connection::{ConnectionEvent, ConnectionState, ConnectionStatus, EventKind};

/// Every event delivered to the subscriptions it owns, in order.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<ConnectionEvent>>>,
}

impl EventLog {
    /// Subscribe to every kind on `manager`.
    #[must_use]
    pub fn attach(manager: &ConnectionManager) -> (Self, Vec<Subscription>) {
        let log = Self::default();
        let subscriptions = EventKind::ALL
            .into_iter()
            .map(|kind| log.attach_kind(manager, kind))
            .collect();
        (log, subscriptions)
    }

    /// Subscribe to one kind on `manager`.
    #[must_use]
    pub fn attach_kind(&self, manager: &ConnectionManager, kind: EventKind) -> Subscription {
        let events = Arc::clone(&self.events);
        manager.subscribe(kind, move |event| events.lock().push(event.clone()))
    }

    #[must_use]
    pub fn events(&self) -> Vec<ConnectionEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(ConnectionEvent::kind).collect()
    }

    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    #[must_use]
    pub fn last(&self, kind: EventKind) -> Option<ConnectionEvent> {
        self.events
            .lock()
            .iter()
            .rev()
            .find(|e| e.kind() == kind)
            .cloned()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// Wait until the manager reports `state`, for at most `limit` of Tokio time.
///
/// Returns `false` on timeout.
pub async fn wait_for_state(
    status: &mut watch::Receiver<ConnectionStatus>,
    state: ConnectionState,
    limit: Duration,
) -> bool {
    matches!(
        tokio::time::timeout(limit, status.wait_for(|s| s.state == state)).await,
        Ok(Ok(_))
    )
}

/// Let spawned tasks run without advancing the clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
