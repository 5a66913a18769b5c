//! Self-reconnecting typed message channel.
//!
//! A [`ResilientChannel`] owns exactly one underlying connection at a time.
//! When that connection closes unexpectedly it emits `on_close`, waits the
//! current back-off delay and opens a brand-new connection; the old one is
//! never reused.  Callers see the lifecycle only through the four event
//! channels and [`status`](ResilientChannel::status).
//!
//! ```text
//!   open() ──► Connecting ──ok──► Open ──drop/close──┐
//!                  │                                 ▼
//!                  └──────fail (on_error)──────► on_close ──► retry timer ──► open()
//! ```

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::event::{EventChannel, Unsubscribe};
use crate::reconnect::{ReconnectBackoff, RetrySchedule};
use crate::transport::{Connector, Duplex, WireEvent};
use crate::types::{ChannelError, CloseEvent, ConnectionStatus};

/// One underlying connection.  Replaced wholesale on reconnect.
struct Connection {
    status: Mutex<ConnectionStatus>,
    outbound: mpsc::UnboundedSender<String>,
}

impl Connection {
    fn status(&self) -> ConnectionStatus {
        *self.status.lock()
    }

    fn set_status(&self, status: ConnectionStatus) {
        *self.status.lock() = status;
    }
}

struct Shared<In> {
    url: String,
    connector: Arc<dyn Connector>,
    max_inbound_bytes: usize,
    schedule: Mutex<RetrySchedule>,
    active: Mutex<Arc<Connection>>,
    retry_timer: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
    on_open: EventChannel<()>,
    on_close: EventChannel<CloseEvent>,
    on_error: EventChannel<ChannelError>,
    on_message: EventChannel<In>,
}

/// Best-effort always-connected duplex channel that sends `Out` and
/// receives `In`, both as JSON text frames.
///
/// Create via [`ChannelBuilder`](crate::builder::ChannelBuilder).  Dropping
/// the channel shuts it down.
pub struct ResilientChannel<Out, In> {
    shared: Arc<Shared<In>>,
    _out: PhantomData<fn(Out)>,
}

impl<Out, In> ResilientChannel<Out, In>
where
    Out: Serialize,
    In: DeserializeOwned + Send + 'static,
{
    /// Start connecting to `url`.  Must be called inside a Tokio runtime.
    pub(crate) fn start(
        url: String,
        connector: Arc<dyn Connector>,
        backoff: ReconnectBackoff,
        max_inbound_bytes: usize,
    ) -> Self {
        // Placeholder until `open` installs the first real connection.
        let (placeholder_tx, _) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            url,
            connector,
            max_inbound_bytes,
            schedule: Mutex::new(RetrySchedule::new(backoff)),
            active: Mutex::new(Arc::new(Connection {
                status: Mutex::new(ConnectionStatus::Closed),
                outbound: placeholder_tx,
            })),
            retry_timer: Mutex::new(None),
            shutdown: CancellationToken::new(),
            on_open: EventChannel::new(),
            on_close: EventChannel::new(),
            on_error: EventChannel::new(),
            on_message: EventChannel::new(),
        });
        shared.open();

        Self {
            shared,
            _out: PhantomData,
        }
    }

    /// Serialize `msg` and write it to the active connection.
    ///
    /// Nothing is queued while disconnected: if the connection is not open
    /// the message is dropped and [`ChannelError::NotOpen`] returned.  A
    /// frame accepted here can still be lost if the connection drops
    /// before it reaches the wire.
    pub fn send(&self, msg: &Out) -> Result<(), ChannelError> {
        let conn = self.shared.active.lock().clone();
        let status = conn.status();
        if status != ConnectionStatus::Open {
            return Err(ChannelError::NotOpen(status));
        }
        let json = serde_json::to_string(msg).map_err(|e| ChannelError::Encode(e.to_string()))?;
        conn.outbound
            .send(json)
            .map_err(|_| ChannelError::NotOpen(ConnectionStatus::Closed))
    }

    /// Current state of the active connection, read live.
    pub fn status(&self) -> ConnectionStatus {
        self.shared.active.lock().status()
    }

    /// Notify when a connection becomes ready to send.
    pub fn on_open<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&()) + Send + Sync + 'static,
    {
        self.shared.on_open.subscribe(handler)
    }

    /// Notify when a connection closes.  A reconnect follows on its own.
    pub fn on_close<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&CloseEvent) + Send + Sync + 'static,
    {
        self.shared.on_close.subscribe(handler)
    }

    /// Notify on transport errors and undeliverable inbound frames.
    pub fn on_error<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&ChannelError) + Send + Sync + 'static,
    {
        self.shared.on_error.subscribe(handler)
    }

    /// Receive decoded inbound messages.
    pub fn on_message<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&In) + Send + Sync + 'static,
    {
        self.shared.on_message.subscribe(handler)
    }

    /// Endpoint this channel connects to.
    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// Delay the next scheduled reconnect will wait.
    pub fn retry_delay(&self) -> Duration {
        self.shared.schedule.lock().current_delay()
    }

    /// Whether a reconnect timer is pending.
    pub fn is_retry_scheduled(&self) -> bool {
        self.shared.schedule.lock().is_scheduled()
    }
}

impl<Out, In> ResilientChannel<Out, In> {
    /// Stop for good: cancel any pending reconnect and close the active
    /// connection.  Idempotent.
    pub fn shutdown(&self) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        tracing::info!(url = %self.shared.url, "shutting down channel");
        self.shared.shutdown.cancel();
        if let Some(timer) = self.shared.retry_timer.lock().take() {
            timer.abort();
        }
        self.shared.active.lock().set_status(ConnectionStatus::Closed);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }
}

impl<Out, In> Drop for ResilientChannel<Out, In> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<In> Shared<In>
where
    In: DeserializeOwned + Send + 'static,
{
    /// Install a fresh connection and start driving it.
    fn open(self: &Arc<Self>) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let conn = Arc::new(Connection {
            status: Mutex::new(ConnectionStatus::Connecting),
            outbound: outbound_tx,
        });
        *self.active.lock() = conn.clone();

        let shared = self.clone();
        tokio::spawn(async move { shared.drive(conn, outbound_rx).await });
    }

    /// Single connection lifecycle: connect -> pump frames -> close.
    async fn drive(
        self: Arc<Self>,
        conn: Arc<Connection>,
        mut outbound: mpsc::UnboundedReceiver<String>,
    ) {
        tracing::debug!(url = %self.url, "connecting");

        let connected = tokio::select! {
            r = self.connector.connect(&self.url) => r,
            _ = self.shutdown.cancelled() => {
                conn.set_status(ConnectionStatus::Closed);
                return;
            }
        };

        let Duplex {
            mut sink,
            mut stream,
        } = match connected {
            Ok(duplex) => duplex,
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "connection attempt failed");
                conn.set_status(ConnectionStatus::Closed);
                self.on_error.emit(&ChannelError::Transport(e));
                self.handle_close(CloseEvent::abnormal());
                return;
            }
        };

        conn.set_status(ConnectionStatus::Open);
        self.schedule.lock().on_open();
        tracing::info!(url = %self.url, "connection open");
        self.on_open.emit(&());

        let mut close = CloseEvent::abnormal();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    conn.set_status(ConnectionStatus::Closed);
                    let _ = sink.close().await;
                    return;
                }
                Some(text) = outbound.recv() => {
                    if let Err(e) = sink.send(text).await {
                        tracing::warn!(url = %self.url, error = %e, "failed to write frame");
                        self.on_error.emit(&ChannelError::Transport(e));
                    }
                }
                item = stream.next() => match item {
                    Some(Ok(WireEvent::Text(text))) => self.dispatch(&text),
                    Some(Ok(WireEvent::Close(event))) => {
                        conn.set_status(ConnectionStatus::Closing);
                        close = event;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(url = %self.url, error = %e, "transport error");
                        self.on_error.emit(&ChannelError::Transport(e));
                        break;
                    }
                    None => break,
                },
            }
        }

        conn.set_status(ConnectionStatus::Closed);
        self.handle_close(close);
    }

    /// Decode one inbound frame and hand it to `on_message`.
    fn dispatch(&self, text: &str) {
        if text.len() > self.max_inbound_bytes {
            tracing::warn!(
                bytes = text.len(),
                max = self.max_inbound_bytes,
                "inbound frame exceeds max_inbound_bytes, dropping"
            );
            self.on_error.emit(&ChannelError::FrameTooLarge {
                bytes: text.len(),
                max: self.max_inbound_bytes,
            });
            return;
        }

        match serde_json::from_str::<In>(text) {
            Ok(msg) => self.on_message.emit(&msg),
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse inbound message");
                self.on_error.emit(&ChannelError::Decode(e.to_string()));
            }
        }
    }

    /// The active connection ended: report it and schedule one reconnect.
    fn handle_close(self: &Arc<Self>, event: CloseEvent) {
        tracing::info!(
            url = %self.url,
            code = event.code,
            reason = %event.reason,
            "connection closed"
        );
        self.on_close.emit(&event);

        if self.shutdown.is_cancelled() {
            return;
        }
        let delay = self.schedule.lock().on_close();
        let Some(delay) = delay else {
            tracing::debug!(url = %self.url, "reconnect already scheduled");
            return;
        };

        tracing::info!(
            url = %self.url,
            delay_ms = delay.as_millis() as u64,
            "reconnecting"
        );
        let shared = self.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shared.shutdown.cancelled() => return,
            }
            shared.schedule.lock().on_retry_fired();
            shared.open();
        });
        *self.retry_timer.lock() = Some(timer);
    }
}
