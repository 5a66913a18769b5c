//! `fs-client-sdk` — client side of the file streamer.
//!
//! A page is either a sender (offers files) or a receiver (asks a sender
//! for them).  Both talk to the server over one long-lived WebSocket that
//! this crate keeps alive for them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Application (UI / CLI)                                      │
//! │                                                              │
//! │   let client = FileStreamClient::new(                        │
//! │       PageLocation::parse("http://host/?id=abc")?,           │
//! │       ClientConfig::default(),                               │
//! │   )?;                                                        │
//! │   let ch = client.receiver()?;                               │
//! │   ch.on_message(|msg| ...);                                  │
//! │   ch.send(&ReceiverToServer::PleaseFileList)?;               │
//! └──────────────────────────────────────────────────────────────┘
//!          │ role (PageLocation → Mode)
//!          ▼
//!   ResilientChannel ──► Connector (tokio-tungstenite) ──► ws://host/api/<role>/ws
//!          │
//!          └─► on_open / on_close / on_error / on_message (EventChannel)
//! ```
//!
//! # Connection flow
//!
//! 1. Resolve the role from the page address (`?id=<sender>` → receiver)
//! 2. Connect to `ws(s)://<host>/api/<role>/ws`
//! 3. On open: emit `on_open`, reset the back-off to its minimum
//! 4. Inbound text frames are decoded as JSON and emitted via `on_message`
//! 5. On close: emit `on_close`, wait the back-off delay (1s, 2s, 4s, …
//!    capped at 10s) and open a fresh connection

pub mod api;
pub mod builder;
pub mod channel;
pub mod config;
pub mod event;
pub mod reconnect;
pub mod role;
pub mod transport;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use api::{FileStreamClient, ReceiverChannel, RoleChannel, SenderChannel};
pub use builder::ChannelBuilder;
pub use channel::ResilientChannel;
pub use config::{ChannelConfig, ClientConfig, ReconnectConfig};
pub use event::{EventChannel, Unsubscribe};
pub use reconnect::{ReconnectBackoff, RetrySchedule};
pub use role::{parse_query, Mode, PageLocation, Role, PAGE_URL_ENV};
pub use transport::{Connector, Duplex, TransportError, WireEvent, WsConnector};
pub use types::{ChannelError, ClientError, CloseEvent, ConnectionStatus};

// Re-export protocol types so applications never need to import fs-protocol directly.
pub use fs_protocol::{
    download_path, upload_path, File, FileInfo, ReceiverToServer, SenderToServer,
    ServerToReceiver, ServerToSender,
};
