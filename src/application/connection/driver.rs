//! The task that owns the connection.
//!
//! Every state transition happens inside [`Driver::run`]. Handles talk to
//! it over a command channel; the reader task and the timers feed the same
//! `select!` loop, so there is exactly one timeline and no shared mutable
//! connection state.
//!
//! Timers are plain `Option` fields: arming one replaces the previous
//! deadline and every state exit clears the ones that would go stale.

use std::collections::VecDeque;
use std::future::{pending, Future};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, timeout, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use super::backoff::Backoff;
use super::registry::SubscriberRegistry;
use super::ConnectionOptions;
use crate::domain::connection::{ConnectionEvent, ConnectionState, ConnectionStatus};
use crate::domain::frame::{heartbeat_frame, parse_frame, InboundFrame};
use crate::error::ConnectionError;
use crate::port::outbound::transport::{Connector, FrameSink, FrameSource, Link};

pub(super) type ConnectReply = oneshot::Sender<Result<(), ConnectionError>>;

type Handshake = Pin<Box<dyn Future<Output = Result<Link, ConnectionError>> + Send>>;

/// Requests from [`ConnectionManager`](super::ConnectionManager) handles.
pub(super) enum Command {
    Connect {
        address: String,
        reply: Option<ConnectReply>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Send(String),
    /// Forget the queue, the attempt counter and the address.
    Clear {
        reply: oneshot::Sender<()>,
    },
}

/// Messages from the reader task of link `generation`.
enum Inbound {
    Frame { generation: u64, text: String },
    Closed {
        generation: u64,
        error: Option<ConnectionError>,
    },
}

pub(super) struct Driver {
    options: ConnectionOptions,
    connector: Arc<dyn Connector>,
    registry: Arc<SubscriberRegistry>,
    status: watch::Sender<ConnectionStatus>,
    commands: mpsc::UnboundedReceiver<Command>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,

    state: ConnectionState,
    address: Option<String>,
    backoff: Backoff,
    queue: VecDeque<String>,

    handshake: Option<Handshake>,
    connect_waiters: Vec<ConnectReply>,

    sink: Option<Box<dyn FrameSink>>,
    reader: Option<JoinHandle<()>>,
    generation: u64,
    heartbeat: Option<Interval>,

    close_deadline: Option<Instant>,
    close_waiters: Vec<oneshot::Sender<()>>,

    reconnect_at: Option<Instant>,
}

impl Driver {
    pub(super) fn new(
        options: ConnectionOptions,
        connector: Arc<dyn Connector>,
        registry: Arc<SubscriberRegistry>,
        status: watch::Sender<ConnectionStatus>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let backoff = Backoff::new(options.backoff_base, options.max_reconnect_attempts);
        Self {
            options,
            connector,
            registry,
            status,
            commands,
            inbound_tx,
            inbound_rx,
            state: ConnectionState::Closed,
            address: None,
            backoff,
            queue: VecDeque::new(),
            handshake: None,
            connect_waiters: Vec::new(),
            sink: None,
            reader: None,
            generation: 0,
            heartbeat: None,
            close_deadline: None,
            close_waiters: Vec::new(),
            reconnect_at: None,
        }
    }

    /// Drive the connection until every handle has been dropped.
    pub(super) async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => break,
                },
                Some(inbound) = self.inbound_rx.recv() => self.on_inbound(inbound),
                result = poll_handshake(&mut self.handshake) => {
                    self.handshake = None;
                    self.on_handshake(result).await;
                }
                () = sleep_until_deadline(self.reconnect_at) => self.on_reconnect_due(),
                () = tick(&mut self.heartbeat) => self.on_heartbeat().await,
                () = sleep_until_deadline(self.close_deadline) => {
                    warn!(
                        grace_ms = self.options.close_grace.as_millis() as u64,
                        "Close acknowledgment timed out, forcing teardown"
                    );
                    self.finish_close();
                }
            }
            self.publish_status();
        }

        debug!("All connection handles dropped, shutting down driver");
        self.drop_link();
        self.handshake = None;
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Err(ConnectionError::Shutdown));
        }
        for waiter in self.close_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect { address, reply } => self.on_connect(address, reply),
            Command::Disconnect { reply } => self.on_disconnect(reply).await,
            Command::Send(payload) => self.on_send(payload).await,
            Command::Clear { reply } => {
                self.queue.clear();
                self.backoff.reset();
                self.reconnect_at = None;
                if matches!(
                    self.state,
                    ConnectionState::Closed | ConnectionState::RetriesExhausted
                ) {
                    self.address = None;
                    self.set_state(ConnectionState::Closed);
                }
                let _ = reply.send(());
            }
        }
    }

    fn on_connect(&mut self, address: String, reply: Option<ConnectReply>) {
        match self.state {
            ConnectionState::Open => {
                debug!(address = %address, "Already connected");
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(()));
                }
            }
            ConnectionState::Connecting => {
                debug!(address = %address, "Connection already in progress");
                self.connect_waiters.extend(reply);
            }
            ConnectionState::Closing => {
                // Finish the intentional close now, then start over.
                self.finish_close();
                self.start_connect(address, reply);
            }
            ConnectionState::RetriesExhausted => {
                info!(address = %address, "Manual connect after exhausted retries");
                self.backoff.reset();
                self.start_connect(address, reply);
            }
            ConnectionState::Closed => {
                self.reconnect_at = None;
                self.start_connect(address, reply);
            }
        }
    }

    fn start_connect(&mut self, address: String, reply: Option<ConnectReply>) {
        info!(address = %address, attempt = self.backoff.attempts(), "Connecting");
        let connector = Arc::clone(&self.connector);
        let limit = self.options.connect_timeout;
        let target = address.clone();
        self.handshake = Some(Box::pin(async move {
            match timeout(limit, connector.open(&target)).await {
                Ok(result) => result,
                Err(_) => Err(ConnectionError::Timeout {
                    operation: "connect",
                    after: limit,
                }),
            }
        }));
        self.address = Some(address);
        self.connect_waiters.extend(reply);
        self.set_state(ConnectionState::Connecting);
    }

    async fn on_handshake(&mut self, result: Result<Link, ConnectionError>) {
        match result {
            Ok(link) => self.on_open(link).await,
            Err(err) => {
                warn!(error = %err, "Connection attempt failed");
                self.set_state(ConnectionState::Closed);
                for waiter in self.connect_waiters.drain(..) {
                    let _ = waiter.send(Err(err.clone()));
                }
                self.emit(ConnectionEvent::Error(err));
                self.schedule_reconnect();
            }
        }
    }

    async fn on_open(&mut self, link: Link) {
        let Link { sink, source } = link;
        self.generation += 1;
        self.reader = Some(spawn_reader(
            self.generation,
            source,
            self.inbound_tx.clone(),
        ));
        self.sink = Some(sink);
        self.backoff.reset();

        let period = self.options.heartbeat_interval.max(Duration::from_millis(1));
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.heartbeat = Some(heartbeat);

        self.set_state(ConnectionState::Open);
        let address = self.address.clone().unwrap_or_default();
        info!(address = %address, generation = self.generation, "Connected");

        self.flush_queue().await;
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Ok(()));
        }
        self.emit(ConnectionEvent::Connected {
            address,
            at: Utc::now(),
        });
    }

    async fn flush_queue(&mut self) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let pending = self.queue.len();
        while let Some(payload) = self.queue.pop_front() {
            if let Err(err) = sink.send(payload.clone()).await {
                warn!(error = %err, remaining = self.queue.len() + 1, "Queue flush interrupted");
                self.queue.push_front(payload);
                return;
            }
        }
        if pending > 0 {
            debug!(flushed = pending, "Flushed outbound queue");
        }
    }

    async fn on_disconnect(&mut self, reply: oneshot::Sender<()>) {
        match self.state {
            ConnectionState::Connecting => {
                info!("Disconnect requested during handshake, cancelling");
                self.handshake = None;
                for waiter in self.connect_waiters.drain(..) {
                    let _ = waiter.send(Err(ConnectionError::Cancelled));
                }
                self.set_state(ConnectionState::Closed);
                self.emit(ConnectionEvent::Disconnected { at: Utc::now() });
                let _ = reply.send(());
            }
            ConnectionState::Open => {
                info!("Closing connection");
                self.heartbeat = None;
                self.close_waiters.push(reply);
                self.set_state(ConnectionState::Closing);
                self.close_deadline = Some(Instant::now() + self.options.close_grace);

                let grace = self.options.close_grace;
                let closed = match self.sink.as_mut() {
                    Some(sink) => timeout(grace, sink.close()).await,
                    None => Ok(Ok(())),
                };
                match closed {
                    Ok(Ok(())) => trace!("Close requested, awaiting acknowledgment"),
                    Ok(Err(err)) => {
                        warn!(error = %err, "Close request failed, tearing down");
                        self.finish_close();
                    }
                    Err(_) => {
                        warn!("Close request stalled, tearing down");
                        self.finish_close();
                    }
                }
            }
            ConnectionState::Closing => self.close_waiters.push(reply),
            ConnectionState::Closed => {
                if self.reconnect_at.take().is_some() {
                    info!("Pending reconnect cancelled");
                    self.emit(ConnectionEvent::Disconnected { at: Utc::now() });
                }
                let _ = reply.send(());
            }
            ConnectionState::RetriesExhausted => {
                self.set_state(ConnectionState::Closed);
                let _ = reply.send(());
            }
        }
    }

    /// Complete an intentional close. Never schedules a reconnect.
    fn finish_close(&mut self) {
        self.close_deadline = None;
        self.drop_link();
        self.set_state(ConnectionState::Closed);
        info!("Disconnected");
        self.emit(ConnectionEvent::Disconnected { at: Utc::now() });
        for waiter in self.close_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn drop_link(&mut self) {
        self.heartbeat = None;
        self.sink = None;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }

    async fn on_send(&mut self, payload: String) {
        if self.state != ConnectionState::Open {
            trace!(queued = self.queue.len() + 1, "Not connected, queueing message");
            self.queue.push_back(payload);
            return;
        }
        // Earlier payloads left behind by a failed send go first.
        self.queue.push_back(payload);
        self.flush_queue().await;
    }

    fn on_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Frame { generation, .. } | Inbound::Closed { generation, .. }
                if generation != self.generation =>
            {
                trace!(generation, current = self.generation, "Dropping message from stale link");
            }
            Inbound::Frame { text, .. } => self.on_frame(&text),
            Inbound::Closed { error, .. } => self.on_transport_closed(error),
        }
    }

    fn on_frame(&mut self, text: &str) {
        match parse_frame(text) {
            Ok(InboundFrame::Ping) => trace!("Heartbeat acknowledged"),
            Ok(InboundFrame::Event { kind, payload }) => {
                trace!(kind = %kind, "Dispatching event");
                self.emit(ConnectionEvent::Message { kind, payload });
            }
            Err(err) => {
                warn!(error = %err, bytes = text.len(), "Failed to parse message");
                self.emit(ConnectionEvent::Error(err));
            }
        }
    }

    fn on_transport_closed(&mut self, error: Option<ConnectionError>) {
        match self.state {
            ConnectionState::Closing => {
                trace!("Close acknowledged");
                self.finish_close();
            }
            ConnectionState::Open => {
                self.reader = None;
                self.drop_link();
                self.set_state(ConnectionState::Closed);
                match error {
                    Some(err) => {
                        warn!(error = %err, "Connection lost");
                        self.emit(ConnectionEvent::Error(err));
                    }
                    None => warn!("Connection closed by peer"),
                }
                self.schedule_reconnect();
            }
            _ => {}
        }
    }

    fn schedule_reconnect(&mut self) {
        match self.backoff.next_delay() {
            Some(delay) => {
                info!(
                    delay_ms = delay.as_millis() as u64,
                    attempt = self.backoff.attempts(),
                    max_attempts = self.backoff.max_attempts(),
                    "Reconnecting after delay"
                );
                self.reconnect_at = Some(Instant::now() + delay);
            }
            None => {
                let attempts = self.backoff.attempts();
                error!(attempts, "Reconnect attempts exhausted");
                self.reconnect_at = None;
                self.set_state(ConnectionState::RetriesExhausted);
                self.emit(ConnectionEvent::Error(ConnectionError::ExhaustedRetries {
                    attempts,
                }));
            }
        }
    }

    fn on_reconnect_due(&mut self) {
        self.reconnect_at = None;
        if self.state != ConnectionState::Closed {
            return;
        }
        if let Some(address) = self.address.clone() {
            self.start_connect(address, None);
        }
    }

    async fn on_heartbeat(&mut self) {
        if self.state != ConnectionState::Open {
            self.heartbeat = None;
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            trace!("Sending heartbeat");
            if let Err(err) = sink.send(heartbeat_frame()).await {
                warn!(error = %err, "Heartbeat send failed");
            }
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        self.registry.emit(&event);
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "Connection state changed");
            self.state = state;
        }
        self.publish_status();
    }

    fn publish_status(&self) {
        let next = ConnectionStatus {
            state: self.state,
            address: self.address.clone(),
            reconnect_attempts: self.backoff.attempts(),
            queued: self.queue.len(),
        };
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Forward frames from `source` until it ends.
fn spawn_reader(
    generation: u64,
    mut source: Box<dyn FrameSource>,
    tx: mpsc::UnboundedSender<Inbound>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let inbound = match source.next_frame().await {
                Some(Ok(text)) => Inbound::Frame { generation, text },
                Some(Err(error)) => Inbound::Closed {
                    generation,
                    error: Some(error),
                },
                None => Inbound::Closed {
                    generation,
                    error: None,
                },
            };
            let done = matches!(inbound, Inbound::Closed { .. });
            if tx.send(inbound).is_err() || done {
                break;
            }
        }
    })
}

async fn poll_handshake(handshake: &mut Option<Handshake>) -> Result<Link, ConnectionError> {
    match handshake {
        Some(fut) => fut.await,
        None => pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}

async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deadline_helper_pends_without_deadline() {
        let result = timeout(Duration::from_secs(60), sleep_until_deadline(None)).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_helper_wakes_at_deadline() {
        let start = Instant::now();
        sleep_until_deadline(Some(start + Duration::from_millis(1500))).await;
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }
}
