//! Builder pattern for constructing a [`ResilientChannel`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::channel::ResilientChannel;
use crate::config::ClientConfig;
use crate::reconnect::ReconnectBackoff;
use crate::transport::{Connector, WsConnector};
use crate::types::ClientError;

/// Fluent builder for [`ResilientChannel`].
///
/// # Example
///
/// ```rust,no_run
/// # use fs_client_sdk::ChannelBuilder;
/// # use fs_protocol::{SenderToServer, ServerToSender};
/// # async fn demo() -> Result<(), fs_client_sdk::ClientError> {
/// let channel = ChannelBuilder::new()
///     .url("ws://localhost:8080/api/sender/ws")
///     .build::<SenderToServer, ServerToSender>()?;
/// channel.on_open(|_| tracing::info!("connected"));
/// # Ok(())
/// # }
/// ```
pub struct ChannelBuilder {
    url: String,
    connector: Arc<dyn Connector>,
    reconnect_backoff: ReconnectBackoff,
    max_inbound_bytes: usize,
}

impl ChannelBuilder {
    pub fn new() -> Self {
        Self {
            url: String::new(),
            connector: Arc::new(WsConnector),
            reconnect_backoff: ReconnectBackoff::default(),
            max_inbound_bytes: fs_protocol::MAX_FRAME_BYTES,
        }
    }

    // ── Required ─────────────────────────────────────────────────────

    /// Set the endpoint URL (e.g. `ws://host/api/sender/ws`).
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    // ── Behavior ─────────────────────────────────────────────────────

    /// Replace the transport (default: [`WsConnector`]).
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Override the reconnect backoff policy.
    pub fn reconnect_backoff(mut self, backoff: ReconnectBackoff) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Maximum inbound frame size (default 256 KB).
    pub fn max_inbound_bytes(mut self, n: usize) -> Self {
        self.max_inbound_bytes = n;
        self
    }

    /// Apply the reconnect and channel sections of a [`ClientConfig`].
    pub fn config(self, config: &ClientConfig) -> Self {
        self.reconnect_backoff(config.reconnect.backoff())
            .max_inbound_bytes(config.channel.max_inbound_bytes)
    }

    /// Build the channel and start its first connection attempt.
    ///
    /// Fails if the settings are unusable or no Tokio runtime is running.
    pub fn build<Out, In>(self) -> Result<ResilientChannel<Out, In>, ClientError>
    where
        Out: Serialize,
        In: DeserializeOwned + Send + 'static,
    {
        if self.url.is_empty() {
            return Err(ClientError::Config("url is required".into()));
        }
        let backoff = &self.reconnect_backoff;
        if backoff.min_delay.is_zero() || backoff.min_delay > backoff.max_delay {
            return Err(ClientError::Config(format!(
                "invalid reconnect backoff: min {:?}, max {:?}",
                backoff.min_delay, backoff.max_delay
            )));
        }
        if self.max_inbound_bytes == 0 {
            return Err(ClientError::Config(
                "max_inbound_bytes must be greater than 0".into(),
            ));
        }
        tokio::runtime::Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        Ok(ResilientChannel::start(
            self.url,
            self.connector,
            self.reconnect_backoff,
            self.max_inbound_bytes,
        ))
    }
}

impl Default for ChannelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
