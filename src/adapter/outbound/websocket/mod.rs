//! WebSocket transport for the dashboard feed.
//!
//! [`WsConnector`] performs the handshake with `tokio-tungstenite` and
//! splits the socket into a [`FrameSink`] and a [`FrameSource`]. Protocol
//! pings are answered by tungstenite itself; only text frames reach the
//! connection manager.

use std::sync::Once;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};

use crate::error::ConnectionError;
use crate::port::outbound::transport::{Connector, FrameSink, FrameSource, Link};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

static CRYPTO_PROVIDER: Once = Once::new();

/// Install the ring crypto provider for `wss://` addresses.
///
/// Another provider installed first by the embedding process wins.
fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Opens WebSocket links.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl WsConnector {
    #[must_use]
    pub fn new() -> Self {
        install_crypto_provider();
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, address: &str) -> Result<Link, ConnectionError> {
        install_crypto_provider();
        debug!(address, "Opening WebSocket");

        let (socket, response) = connect_async(address).await?;
        info!(address, status = %response.status(), "WebSocket handshake complete");

        let (sink, stream) = socket.split();
        Ok(Link {
            sink: Box::new(WsSink { inner: sink }),
            source: Box::new(WsSource { inner: stream }),
        })
    }
}

struct WsSink {
    inner: SplitSink<Socket, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, text: String) -> Result<(), ConnectionError> {
        trace!(bytes = text.len(), "Sending WebSocket text frame");
        self.inner.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        match self.inner.close().await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

struct WsSource {
    inner: SplitStream<Socket>,
}

#[async_trait]
impl FrameSource for WsSource {
    async fn next_frame(&mut self) -> Option<Result<String, ConnectionError>> {
        while let Some(message) = self.inner.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    trace!(bytes = text.len(), "Received WebSocket text frame");
                    return Some(Ok(text));
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "WebSocket close frame received");
                    return None;
                }
                // Binary, ping and pong frames carry nothing for subscribers.
                Ok(_) => {}
                Err(WsError::ConnectionClosed) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }
}
