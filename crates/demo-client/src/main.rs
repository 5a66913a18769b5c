//! Headless file-streamer page.
//!
//! Resolves its role from a page address, connects to the matching
//! server endpoint and keeps the connection alive across drops:
//!
//! - sender (`http://host/`): handshakes and answers file-list requests
//!   with an empty list
//! - receiver (`http://host/?id=<sender>`): handshakes, asks for the
//!   sender's file list and logs every update
//!
//! Usage:
//!   fs-client --page-url http://localhost:8080/?id=abc
//!   FS_PAGE_URL=http://localhost:8080/ fs-client connect
//!
//! Env vars:
//!   FS_PAGE_URL  — page address when `--page-url` is not given
//!   FS_CONFIG    — config file (default: "fs-client.toml")
//!   RUST_LOG     — log filter (default: "info")

mod cli;

use std::sync::Arc;

use clap::Parser;
use fs_client_sdk::{
    ClientConfig, FileStreamClient, ReceiverChannel, ReceiverToServer, ResilientChannel,
    RoleChannel, SenderChannel, SenderToServer, ServerToReceiver, ServerToSender,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command.unwrap_or(Command::Connect) {
        Command::Connect => {
            let (config, config_path) = cli::load_config()?;
            tracing::debug!(path = %config_path, "configuration loaded");
            let location = cli::page_location(cli.page_url.as_deref())?;
            let client = FileStreamClient::new(location, config)?;
            run(client).await
        }
        Command::Role => {
            let location = cli::page_location(cli.page_url.as_deref())?;
            let client = FileStreamClient::new(location, ClientConfig::default())?;
            let mode = client.mode();
            println!("role:     {}", mode.role());
            println!("peer id:  {}", mode.peer_id().unwrap_or("-"));
            println!("endpoint: {}", client.endpoint_url());
            Ok(())
        }
        Command::Config(ConfigCommand::Validate) => {
            let (config, config_path) = cli::load_config()?;
            config.validate()?;
            println!("{config_path}: ok");
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let (config, _) = cli::load_config()?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}

/// Wire the page's channel, then stay connected until Ctrl-C.
async fn run(client: FileStreamClient) -> anyhow::Result<()> {
    tracing::info!(endpoint = %client.endpoint_url(), "connecting");

    match client.channel()? {
        RoleChannel::Sender(ch) => {
            log_lifecycle(&ch);
            wire_sender(&ch);
        }
        RoleChannel::Receiver(ch) => {
            log_lifecycle(&ch);
            wire_receiver(&ch, client.mode().peer_id().unwrap_or_default());
        }
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    client.shutdown();
    Ok(())
}

fn log_lifecycle<Out, In>(ch: &ResilientChannel<Out, In>)
where
    Out: Serialize,
    In: DeserializeOwned + Send + 'static,
{
    ch.on_open(|_| tracing::info!("connected"));
    ch.on_close(|ev| {
        tracing::warn!(code = ev.code, reason = %ev.reason, "disconnected, will reconnect")
    });
    ch.on_error(|err| tracing::warn!(error = %err, "channel error"));
}

// ── Sender ────────────────────────────────────────────────────────────

fn wire_sender(ch: &Arc<SenderChannel>) {
    // The id the server assigned; offered back on every reconnect.
    let assigned: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let weak = Arc::downgrade(ch);
    let id = assigned.clone();
    ch.on_open(move |_| {
        let Some(ch) = weak.upgrade() else { return };
        let handshake = SenderToServer::Handshake { id: id.lock().clone() };
        if let Err(e) = ch.send(&handshake) {
            tracing::warn!(error = %e, "handshake not sent");
        }
    });

    let weak = Arc::downgrade(ch);
    ch.on_message(move |msg| match msg {
        ServerToSender::HandshakeAck { id } => {
            tracing::info!(sender_id = %id, "registered as sender; share ?id={id}");
            *assigned.lock() = Some(id.clone());
        }
        ServerToSender::PleaseFileList { receiver_id } => {
            tracing::info!(receiver_id = %receiver_id, "file list requested");
            let Some(ch) = weak.upgrade() else { return };
            let reply = SenderToServer::FileList {
                receiver_id: Some(receiver_id.clone()),
                files: Vec::new(),
            };
            if let Err(e) = ch.send(&reply) {
                tracing::warn!(error = %e, "file list not sent");
            }
        }
        ServerToSender::PleaseUpload { file_id, stream_id } => {
            tracing::warn!(
                file_id = %file_id,
                stream_id = %stream_id,
                "upload requested for a file this client does not offer"
            );
        }
    });
}

// ── Receiver ──────────────────────────────────────────────────────────

fn wire_receiver(ch: &Arc<ReceiverChannel>, sender_id: &str) {
    let assigned: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let weak = Arc::downgrade(ch);
    let id = assigned.clone();
    let wanted = sender_id.to_string();
    ch.on_open(move |_| {
        let Some(ch) = weak.upgrade() else { return };
        let handshake = ReceiverToServer::Handshake {
            id: id.lock().clone(),
            sender_id: Some(wanted.clone()),
        };
        let result = ch
            .send(&handshake)
            .and_then(|_| ch.send(&ReceiverToServer::PleaseFileList));
        if let Err(e) = result {
            tracing::warn!(error = %e, "handshake not sent");
        }
    });

    let sender_id = sender_id.to_string();
    ch.on_message(move |msg| match msg {
        ServerToReceiver::HandshakeAck { id } => {
            tracing::info!(receiver_id = %id, sender_id = %sender_id, "registered as receiver");
            *assigned.lock() = Some(id.clone());
        }
        ServerToReceiver::FileList { files } => {
            tracing::info!(count = files.len(), "file list");
            for file in files {
                tracing::info!(
                    file_id = %file.id,
                    name = %file.name,
                    size = file.size,
                    download = %fs_client_sdk::download_path(&sender_id, &file.id, &file.name),
                    "available"
                );
            }
        }
        ServerToReceiver::FilesAdded { files } => {
            for file in files {
                tracing::info!(file_id = %file.id, name = %file.name, "file added");
            }
        }
        ServerToReceiver::FilesRemoved { files } => {
            for file in files {
                tracing::info!(file_id = %file.id, name = %file.name, "file removed");
            }
        }
    });
}
