//! Scripted transport for connection-manager tests.
//!
//! Each `open()` pops the next [`Handshake`] from the script (falling back
//! to a default once the script is empty) and records when it was called.
//! Accepted handshakes produce a [`LinkHandle`] the test uses to push
//! frames, break the link, and inspect what the client sent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::ConnectionError;
use crate::port::outbound::transport::{Connector, FrameSink, FrameSource, Link};

/// Scripted outcome of one handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    Accept,
    /// Accept after a delay, measured on the Tokio clock.
    AcceptAfter(Duration),
    Refuse(String),
    /// Never complete.
    Hang,
}

/// One recorded `open()` call.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub address: String,
    pub at: Instant,
}

struct Script {
    plan: VecDeque<Handshake>,
    fallback: Handshake,
    ack_close: bool,
    attempts: Vec<Attempt>,
    links: Vec<LinkHandle>,
}

#[derive(Clone)]
pub struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    /// Accepts every handshake and acknowledges every close.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                plan: VecDeque::new(),
                fallback: Handshake::Accept,
                ack_close: true,
                attempts: Vec::new(),
                links: Vec::new(),
            })),
        }
    }

    /// Queue the outcome of the next unscripted handshake.
    #[must_use]
    pub fn then(self, handshake: Handshake) -> Self {
        self.script.lock().plan.push_back(handshake);
        self
    }

    /// Outcome once the script runs out.
    #[must_use]
    pub fn otherwise(self, handshake: Handshake) -> Self {
        self.script.lock().fallback = handshake;
        self
    }

    /// Links never acknowledge a close request.
    #[must_use]
    pub fn ignoring_close(self) -> Self {
        self.script.lock().ack_close = false;
        self
    }

    pub fn push(&self, handshake: Handshake) {
        self.script.lock().plan.push_back(handshake);
    }

    pub fn set_fallback(&self, handshake: Handshake) {
        self.script.lock().fallback = handshake;
    }

    #[must_use]
    pub fn attempts(&self) -> Vec<Attempt> {
        self.script.lock().attempts.clone()
    }

    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.script.lock().attempts.len()
    }

    #[must_use]
    pub fn links(&self) -> Vec<LinkHandle> {
        self.script.lock().links.clone()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.script.lock().links.len()
    }

    /// The most recently accepted link.
    #[must_use]
    pub fn latest_link(&self) -> Option<LinkHandle> {
        self.script.lock().links.last().cloned()
    }

    fn accept(&self) -> Link {
        let (to_client, from_server) = mpsc::unbounded_channel();
        let mut script = self.script.lock();
        let handle = LinkHandle {
            to_client: to_client.clone(),
            sent: Arc::new(Mutex::new(Vec::new())),
            close_requested: Arc::new(AtomicBool::new(false)),
            fail_sends: Arc::new(AtomicBool::new(false)),
        };
        let sink = ScriptedSink {
            link: handle.clone(),
            ack_close: script.ack_close,
        };
        script.links.push(handle);
        Link {
            sink: Box::new(sink),
            source: Box::new(ScriptedSource { rx: from_server }),
        }
    }
}

impl Default for ScriptedConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, address: &str) -> Result<Link, ConnectionError> {
        let handshake = {
            let mut script = self.script.lock();
            script.attempts.push(Attempt {
                address: address.to_string(),
                at: Instant::now(),
            });
            let next = script.plan.pop_front();
            next.unwrap_or_else(|| script.fallback.clone())
        };

        match handshake {
            Handshake::Accept => Ok(self.accept()),
            Handshake::AcceptAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(self.accept())
            }
            Handshake::Refuse(reason) => Err(ConnectionError::Transport(reason)),
            Handshake::Hang => std::future::pending().await,
        }
    }
}

enum ServerFrame {
    Text(String),
    Break(ConnectionError),
    Close,
}

/// Test-side control of one accepted link.
#[derive(Clone)]
pub struct LinkHandle {
    to_client: mpsc::UnboundedSender<ServerFrame>,
    sent: Arc<Mutex<Vec<String>>>,
    close_requested: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
}

impl LinkHandle {
    /// Deliver a text frame to the client.
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.to_client.send(ServerFrame::Text(text.into()));
    }

    pub fn push_json(&self, payload: &Value) {
        self.push(payload.to_string());
    }

    /// Abruptly break the link with a transport error.
    pub fn break_link(&self, reason: &str) {
        let _ = self
            .to_client
            .send(ServerFrame::Break(ConnectionError::Transport(reason.to_string())));
    }

    /// Close the link cleanly from the server side.
    pub fn close(&self) {
        let _ = self.to_client.send(ServerFrame::Close);
    }

    /// Frames the client has sent, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Sent frames other than heartbeats.
    #[must_use]
    pub fn sent_payloads(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|frame| frame != &crate::domain::frame::heartbeat_frame())
            .collect()
    }

    #[must_use]
    pub fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::SeqCst)
    }

    /// Make subsequent client sends fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

struct ScriptedSink {
    link: LinkHandle,
    ack_close: bool,
}

#[async_trait]
impl FrameSink for ScriptedSink {
    async fn send(&mut self, text: String) -> Result<(), ConnectionError> {
        if self.link.fail_sends.load(Ordering::SeqCst) {
            return Err(ConnectionError::Transport("scripted send failure".into()));
        }
        self.link.sent.lock().push(text);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.link.close_requested.store(true, Ordering::SeqCst);
        if self.ack_close {
            self.link.close();
        }
        Ok(())
    }
}

struct ScriptedSource {
    rx: mpsc::UnboundedReceiver<ServerFrame>,
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn next_frame(&mut self) -> Option<Result<String, ConnectionError>> {
        match self.rx.recv().await? {
            ServerFrame::Text(text) => Some(Ok(text)),
            ServerFrame::Break(err) => Some(Err(err)),
            ServerFrame::Close => None,
        }
    }
}
