//! Core types: connection status, close info, and errors.

use std::fmt;

use crate::role::Role;
use crate::transport::TransportError;

/// Live state of the underlying connection.  Mirrors the four WebSocket
/// ready states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Open => "open",
            ConnectionStatus::Closing => "closing",
            ConnectionStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Close code used when a connection ends without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Payload of the `onclose` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub code: u16,
    pub reason: String,
}

impl CloseEvent {
    /// Connection dropped (or never opened) without a close handshake.
    pub fn abnormal() -> Self {
        Self {
            code: CLOSE_ABNORMAL,
            reason: String::new(),
        }
    }

    /// `true` unless the peer sent a close frame.
    pub fn was_abnormal(&self) -> bool {
        self.code == CLOSE_ABNORMAL
    }
}

/// Errors raised by a [`ResilientChannel`](crate::channel::ResilientChannel),
/// either returned from `send` or delivered through `onerror`.
#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("encode: {0}")]
    Encode(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("inbound frame of {bytes} bytes exceeds limit of {max}")]
    FrameTooLarge { bytes: usize, max: usize },
    #[error("connection is {0}, not open")]
    NotOpen(ConnectionStatus),
}

/// Top-level SDK error.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("config: {0}")]
    Config(String),
    /// The page address is missing or unusable; the client cannot start.
    #[error("page location: {0}")]
    Location(String),
    #[error("channel is typed for {requested}, but this page resolved to {resolved}")]
    RoleMismatch { requested: Role, resolved: Role },
    #[error("no tokio runtime available to drive the channel")]
    NoRuntime,
}
