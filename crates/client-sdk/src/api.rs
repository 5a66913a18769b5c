//! Role-typed access to the page's one channel.
//!
//! [`FileStreamClient`] is the application context: it resolves the role
//! from the page address once, and lazily creates a single
//! [`ResilientChannel`] typed for that role.  Asking for the channel with
//! the wrong role is an error rather than a silently mistyped channel.

use std::sync::Arc;

use fs_protocol::{ReceiverToServer, SenderToServer, ServerToReceiver, ServerToSender};
use parking_lot::Mutex;

use crate::builder::ChannelBuilder;
use crate::channel::ResilientChannel;
use crate::config::ClientConfig;
use crate::role::{Mode, PageLocation, Role};
use crate::transport::{Connector, WsConnector};
use crate::types::ClientError;

/// Channel as seen by a sender page.
pub type SenderChannel = ResilientChannel<SenderToServer, ServerToSender>;

/// Channel as seen by a receiver page.
pub type ReceiverChannel = ResilientChannel<ReceiverToServer, ServerToReceiver>;

/// The page's channel, typed by the resolved role.
#[derive(Clone)]
pub enum RoleChannel {
    Sender(Arc<SenderChannel>),
    Receiver(Arc<ReceiverChannel>),
}

impl RoleChannel {
    pub fn role(&self) -> Role {
        match self {
            RoleChannel::Sender(_) => Role::Sender,
            RoleChannel::Receiver(_) => Role::Receiver,
        }
    }
}

pub struct FileStreamClient {
    location: PageLocation,
    mode: Mode,
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    channel: Mutex<Option<RoleChannel>>,
}

impl FileStreamClient {
    /// Resolve the role for `location`.  No connection is made until the
    /// channel is first requested.
    pub fn new(location: PageLocation, config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let mode = Mode::resolve(&location);
        tracing::info!(
            role = %mode.role(),
            peer_id = mode.peer_id().unwrap_or("-"),
            "resolved page role"
        );
        Ok(Self {
            location,
            mode,
            config,
            connector: Arc::new(WsConnector),
            channel: Mutex::new(None),
        })
    }

    /// Replace the transport used when the channel is created.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Endpoint the channel connects to.
    pub fn endpoint_url(&self) -> String {
        self.mode.endpoint_url(&self.location)
    }

    /// The page's channel, created on first call.  Every later call
    /// returns the same instance.
    pub fn channel(&self) -> Result<RoleChannel, ClientError> {
        let mut slot = self.channel.lock();
        if let Some(existing) = slot.as_ref() {
            return Ok(existing.clone());
        }

        let builder = ChannelBuilder::new()
            .url(self.endpoint_url())
            .connector(self.connector.clone())
            .config(&self.config);
        let created = match self.mode.role() {
            Role::Sender => RoleChannel::Sender(Arc::new(builder.build()?)),
            Role::Receiver => RoleChannel::Receiver(Arc::new(builder.build()?)),
        };
        *slot = Some(created.clone());
        Ok(created)
    }

    /// The channel typed for a sender page.
    pub fn sender(&self) -> Result<Arc<SenderChannel>, ClientError> {
        match self.channel()? {
            RoleChannel::Sender(ch) => Ok(ch),
            RoleChannel::Receiver(_) => Err(ClientError::RoleMismatch {
                requested: Role::Sender,
                resolved: Role::Receiver,
            }),
        }
    }

    /// The channel typed for a receiver page.
    pub fn receiver(&self) -> Result<Arc<ReceiverChannel>, ClientError> {
        match self.channel()? {
            RoleChannel::Receiver(ch) => Ok(ch),
            RoleChannel::Sender(_) => Err(ClientError::RoleMismatch {
                requested: Role::Receiver,
                resolved: Role::Sender,
            }),
        }
    }

    /// Shut the channel down, if it was ever created.
    pub fn shutdown(&self) {
        match self.channel.lock().as_ref() {
            Some(RoleChannel::Sender(ch)) => ch.shutdown(),
            Some(RoleChannel::Receiver(ch)) => ch.shutdown(),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::FakeConnector;
    use crate::types::ConnectionStatus;

    fn client(url: &str) -> (FileStreamClient, Arc<FakeConnector>) {
        let (connector, _peers) = FakeConnector::new();
        let location = PageLocation::parse(url).unwrap();
        let client = FileStreamClient::new(location, ClientConfig::default())
            .unwrap()
            .with_connector(connector.clone());
        (client, connector)
    }

    #[tokio::test]
    async fn channel_is_created_once() {
        let (client, connector) = client("http://localhost:8080/");
        let a = client.sender().unwrap();
        let b = client.sender().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.url(), "ws://localhost:8080/api/sender/ws");

        tokio::task::yield_now().await;
        assert_eq!(connector.attempts().len(), 1);
    }

    #[tokio::test]
    async fn wrong_role_is_rejected() {
        let (client, _connector) = client("http://localhost:8080/?id=s1");
        assert!(client.mode().is_receiver());

        let err = client.sender().err().unwrap();
        assert!(matches!(
            err,
            ClientError::RoleMismatch {
                requested: Role::Sender,
                resolved: Role::Receiver
            }
        ));

        // The mismatch did not create a second channel.
        let a = client.receiver().unwrap();
        let b = client.receiver().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.url(), "ws://localhost:8080/api/receiver/ws");
    }

    #[tokio::test]
    async fn shutdown_reaches_channel() {
        let (client, _connector) = client("http://localhost/?id=s1");
        client.shutdown();

        let ch = client.receiver().unwrap();
        client.shutdown();
        assert!(ch.is_shut_down());
        assert_eq!(ch.status(), ConnectionStatus::Closed);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = ClientConfig::default();
        cfg.reconnect.max_delay_ms = 10;
        let loc = PageLocation::parse("http://localhost/").unwrap();
        assert!(matches!(
            FileStreamClient::new(loc, cfg),
            Err(ClientError::Config(_))
        ));
    }
}
