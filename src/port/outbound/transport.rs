//! Transport seam for the connection manager.
//!
//! A [`Connector`] performs the handshake and hands back the two halves of
//! a live link. The manager owns the [`FrameSink`]; a reader task drains
//! the [`FrameSource`].

use async_trait::async_trait;

use crate::error::ConnectionError;

/// Writing half of a live link.
#[async_trait]
pub trait FrameSink: Send {
    /// Transmit one text frame.
    async fn send(&mut self, text: String) -> Result<(), ConnectionError>;

    /// Request a graceful close. The peer's acknowledgment arrives as the
    /// source ending.
    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Reading half of a live link.
#[async_trait]
pub trait FrameSource: Send {
    /// Next text frame. `None` when the link has closed cleanly,
    /// `Some(Err(_))` when it broke.
    async fn next_frame(&mut self) -> Option<Result<String, ConnectionError>>;
}

/// A connected link, split into halves.
pub struct Link {
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
}

/// Opens links to an address.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Perform the handshake. Dropping the returned future abandons it.
    async fn open(&self, address: &str) -> Result<Link, ConnectionError>;
}
