//! Transport seam: how the channel obtains a raw duplex text connection.
//!
//! The channel only ever sees a [`Duplex`] (a sink of outbound text frames
//! and a stream of inbound [`WireEvent`]s).  [`WsConnector`] provides one
//! over `tokio-tungstenite`; tests plug in an in-memory connector.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::future;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::types::CloseEvent;

/// Outbound half: one `String` per text frame.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half.  Ends (`None`) when the connection is gone.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<WireEvent, TransportError>> + Send>>;

/// An established connection, split into its two halves.
pub struct Duplex {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// What the inbound half can yield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// One text frame.
    Text(String),
    /// The peer started the close handshake.
    Close(CloseEvent),
}

/// Errors that can occur at the transport level.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("websocket: {0}")]
    WebSocket(String),

    #[error("connection closed")]
    Closed,
}

/// Opens raw connections to an endpoint URL.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open one connection.  Resolves once the connection is usable.
    async fn connect(&self, url: &str) -> Result<Duplex, TransportError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// WebSocket transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// [`Connector`] backed by `tokio-tungstenite`.  Only text frames are
/// surfaced; binary, ping and pong frames are dropped (tungstenite answers
/// pings itself).
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Duplex, TransportError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;
        let (sink, stream) = ws.split();

        let sink = sink
            .sink_map_err(|e| TransportError::WebSocket(e.to_string()))
            .with(|text: String| future::ready(Ok::<_, TransportError>(Message::Text(text))));

        let stream = stream.filter_map(|item| {
            future::ready(match item {
                Ok(Message::Text(text)) => Some(Ok(WireEvent::Text(text))),
                Ok(Message::Close(frame)) => Some(Ok(WireEvent::Close(close_event(frame)))),
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::WebSocket(e.to_string()))),
            })
        });

        Ok(Duplex {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

fn close_event(frame: Option<CloseFrame<'_>>) -> CloseEvent {
    match frame {
        Some(frame) => CloseEvent {
            code: u16::from(frame.code),
            reason: frame.reason.into_owned(),
        },
        // A close frame without a body means "no status code" (1005).
        None => CloseEvent {
            code: 1005,
            reason: String::new(),
        },
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory connector: every successful `connect` hands the test a
    //! [`FakePeer`] standing in for the server end.

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    use super::*;

    /// Server end of one fake connection.  Dropping it drops the
    /// connection without a close frame.
    pub(crate) struct FakePeer {
        /// Frames the client wrote.
        pub written: mpsc::UnboundedReceiver<String>,
        /// Push inbound events to the client.
        pub inbound: mpsc::UnboundedSender<Result<WireEvent, TransportError>>,
    }

    impl FakePeer {
        pub fn push_text(&self, text: &str) {
            let _ = self.inbound.send(Ok(WireEvent::Text(text.to_string())));
        }
    }

    pub(crate) struct FakeConnector {
        refuse: AtomicBool,
        attempts: Mutex<Vec<Instant>>,
        peers: mpsc::UnboundedSender<FakePeer>,
    }

    impl FakeConnector {
        pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakePeer>) {
            let (peers, peer_rx) = mpsc::unbounded_channel();
            let connector = Arc::new(Self {
                refuse: AtomicBool::new(false),
                attempts: Mutex::new(Vec::new()),
                peers,
            });
            (connector, peer_rx)
        }

        /// Make subsequent connection attempts fail.
        pub fn refuse(&self, on: bool) {
            self.refuse.store(on, Ordering::SeqCst);
        }

        /// When each connection attempt started.
        pub fn attempts(&self) -> Vec<Instant> {
            self.attempts.lock().clone()
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(&self, _url: &str) -> Result<Duplex, TransportError> {
            self.attempts.lock().push(Instant::now());
            if self.refuse.load(Ordering::SeqCst) {
                return Err(TransportError::WebSocket("connection refused".into()));
            }

            let (written_tx, written_rx) = mpsc::unbounded_channel::<String>();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            let _ = self.peers.send(FakePeer {
                written: written_rx,
                inbound: inbound_tx,
            });

            let sink = futures_util::sink::unfold(written_tx, |tx, text: String| async move {
                tx.send(text).map_err(|_| TransportError::Closed)?;
                Ok::<_, TransportError>(tx)
            });
            let stream = futures_util::stream::unfold(inbound_rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            });

            Ok(Duplex {
                sink: Box::pin(sink),
                stream: Box::pin(stream),
            })
        }
    }
}
