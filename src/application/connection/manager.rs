//! Handle to the connection driver.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use super::driver::{Command, Driver};
use super::registry::{SubscriberRegistry, Subscription};
use super::ConnectionOptions;
use crate::domain::connection::{ConnectionEvent, ConnectionState, ConnectionStatus, EventKind};
use crate::error::ConnectionError;
use crate::port::outbound::transport::Connector;

/// Client side of the live dashboard channel.
///
/// Cloning yields another handle to the same connection. The driver task
/// stops once the last handle is dropped; the transport is then dropped
/// without a graceful close.
///
/// Calls never fail synchronously: `send` queues while disconnected, and
/// liveness problems surface as `error` events.
#[derive(Clone)]
pub struct ConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    registry: Arc<SubscriberRegistry>,
    status: watch::Receiver<ConnectionStatus>,
}

impl ConnectionManager {
    /// Spawn the driver task and return a handle to it.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, options: ConnectionOptions) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(ConnectionStatus::default());
        let registry = Arc::new(SubscriberRegistry::new());

        let driver = Driver::new(
            options,
            connector,
            Arc::clone(&registry),
            status_tx,
            command_rx,
        );
        tokio::spawn(driver.run());

        Self {
            commands,
            registry,
            status,
        }
    }

    /// Open the connection to `address`.
    ///
    /// Resolves once the handshake completes. Returns immediately if already
    /// open, and joins the pending handshake if one is in flight, so
    /// concurrent calls never open a second transport.
    ///
    /// # Errors
    ///
    /// Returns the handshake failure, [`ConnectionError::Timeout`] past the
    /// connect deadline, or [`ConnectionError::Cancelled`] if
    /// [`disconnect`](Self::disconnect) intervenes. Failures also arm the
    /// reconnect policy.
    pub async fn connect(&self, address: impl Into<String>) -> Result<(), ConnectionError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Connect {
            address: address.into(),
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| ConnectionError::Shutdown)?
    }

    /// Close the connection intentionally.
    ///
    /// Cancels any handshake or pending reconnect, requests a graceful close,
    /// and returns once the peer acknowledges or the grace period elapses.
    /// No reconnect is scheduled afterwards.
    pub async fn disconnect(&self) {
        let (reply, rx) = oneshot::channel();
        if self.command(Command::Disconnect { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    /// Transmit `payload` now if open, otherwise queue it for the next open.
    pub fn send(&self, payload: impl Into<String>) {
        if self.command(Command::Send(payload.into())).is_err() {
            warn!("Connection driver stopped, message dropped");
        }
    }

    /// Serialize and [`send`](Self::send) a JSON payload.
    pub fn send_json(&self, payload: &Value) {
        self.send(payload.to_string());
    }

    /// Register `callback` for events of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.registry.subscribe(kind, Arc::new(callback))
    }

    /// Register by wire name. Unknown names log a warning and return a
    /// handle that does nothing.
    pub fn subscribe_named<F>(&self, kind: &str, callback: F) -> Subscription
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        match kind.parse::<EventKind>() {
            Ok(kind) => self.subscribe(kind, callback),
            Err(reason) => {
                warn!(kind, %reason, "Ignoring subscription to unknown event kind");
                Subscription::noop()
            }
        }
    }

    /// Disconnect, drop every subscriber, and clear the queue and attempt
    /// counter.
    pub async fn reset(&self) {
        self.disconnect().await;
        self.registry.clear();
        let (reply, rx) = oneshot::channel();
        if self.command(Command::Clear { reply }).is_ok() {
            let _ = rx.await;
        }
        debug!("Connection manager reset");
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Receiver that observes every status change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Number of subscribers registered for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry.count(kind)
    }

    fn command(&self, command: Command) -> Result<(), ConnectionError> {
        self.commands
            .send(command)
            .map_err(|_| ConnectionError::Shutdown)
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}
