//! Handler for `watch`: a live view of the dashboard feed.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::output;
use crate::application::connection::ConnectionManager;
use crate::domain::connection::{ConnectionEvent, ConnectionState, EventKind};
use crate::error::{ConnectionError, Result};

/// Print every feed event until Ctrl-C, then close gracefully.
///
/// A failed first handshake is not fatal: the manager keeps retrying and
/// the command only gives up once the retry ceiling is reached.
///
/// # Errors
///
/// Returns [`ConnectionError::ExhaustedRetries`] when reconnection stops.
pub async fn execute(manager: ConnectionManager, address: String) -> Result<()> {
    let (tx, mut events) = mpsc::unbounded_channel();
    let subscriptions: Vec<_> = EventKind::ALL
        .into_iter()
        .map(|kind| {
            let tx = tx.clone();
            manager.subscribe(kind, move |event: &ConnectionEvent| {
                let _ = tx.send(event.clone());
            })
        })
        .collect();
    drop(tx);

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Feed", output::highlight(&address));
    output::note("Press Ctrl-C to stop");

    if let Err(e) = manager.connect(address.clone()).await {
        warn!(error = %e, address = %address, "Initial connect failed, retrying in background");
    }

    let mut status = manager.watch_state();
    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break Ok(());
            }
            Some(event) = events.recv() => print_event(&event),
            changed = status.changed() => {
                if changed.is_err() {
                    break Err(ConnectionError::Shutdown.into());
                }
                let current = status.borrow_and_update().clone();
                if current.state == ConnectionState::RetriesExhausted {
                    break Err(ConnectionError::ExhaustedRetries {
                        attempts: current.reconnect_attempts,
                    }
                    .into());
                }
            }
        }
    };

    // Drain anything delivered while the loop was deciding to stop.
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }

    manager.disconnect().await;
    for subscription in &subscriptions {
        subscription.unsubscribe();
    }
    if outcome.is_ok() {
        output::success("Disconnected");
    }
    outcome
}

fn print_event(event: &ConnectionEvent) {
    if output::is_json() {
        output::emit_json_line(event.kind().as_str(), event.to_json());
        return;
    }

    let now = Utc::now().format("%H:%M:%S").to_string();
    let message = match event {
        ConnectionEvent::Connected { address, .. } => format!("connected to {address}"),
        ConnectionEvent::Disconnected { .. } => "connection closed".to_string(),
        ConnectionEvent::Error(err) => err.to_string(),
        ConnectionEvent::Message { payload, .. } => payload.to_string(),
    };
    output::event(&now, event.kind().as_str(), &message);
}
