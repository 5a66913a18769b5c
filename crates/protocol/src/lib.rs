//! File-streamer wire protocol: WebSocket message envelopes for both roles.
//!
//! A page is either a **sender** (holds files) or a **receiver** (asks for
//! them).  Each role talks to the server over its own WebSocket endpoint and
//! its own pair of envelope enums.  Every envelope is one JSON text frame,
//! discriminated by a `"type"` field carrying the variant name verbatim:
//!
//! ```text
//! {"type":"Handshake","id":null}
//! {"type":"PleaseUpload","file_id":"f1","stream_id":"s9"}
//! ```

use serde::{Deserialize, Serialize};

/// WebSocket path used by sender pages.
pub const SENDER_WS_PATH: &str = "/api/sender/ws";

/// WebSocket path used by receiver pages.
pub const RECEIVER_WS_PATH: &str = "/api/receiver/ws";

/// Default upper bound on a single inbound text frame (256 KiB).
pub const MAX_FRAME_BYTES: usize = 256 * 1024;

// ── Receiver ⇄ Server ────────────────────────────────────────────────

/// Server → Receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerToReceiver {
    /// Handshake accepted; carries the ID the server assigned (or echoed).
    HandshakeAck { id: String },
    /// The sender added files.
    FilesAdded { files: Vec<File> },
    /// The sender removed files.
    FilesRemoved { files: Vec<File> },
    /// Full list of files the sender currently offers.
    FileList { files: Vec<File> },
}

/// Receiver → Server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReceiverToServer {
    /// Expected first on every connection. A reconnecting receiver passes
    /// the ID it was given previously.  `sender_id` names the sender whose
    /// files this receiver wants; omitted from the frame when unset.
    Handshake {
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_id: Option<String>,
    },
    /// Ask the sender to upload `file_id` into the stream `stream_id`.
    PleaseUpload { file_id: String, stream_id: String },
    /// Ask the sender for its current file list.
    PleaseFileList,
}

// ── Sender ⇄ Server ──────────────────────────────────────────────────

/// Server → Sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerToSender {
    /// Handshake accepted; carries the ID the server assigned (or echoed).
    HandshakeAck { id: String },
    /// A receiver wants `file_id` uploaded into the stream `stream_id`.
    PleaseUpload { file_id: String, stream_id: String },
    /// A receiver wants the file list.
    PleaseFileList { receiver_id: String },
}

/// Sender → Server.
///
/// `receiver_id` targets a single receiver; `None` broadcasts to every
/// receiver attached to this sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SenderToServer {
    /// Expected first on every connection.
    Handshake { id: Option<String> },
    FilesAdded {
        receiver_id: Option<String>,
        files: Vec<File>,
    },
    FilesRemoved {
        receiver_id: Option<String>,
        files: Vec<File>,
    },
    FileList {
        receiver_id: Option<String>,
        files: Vec<File>,
    },
    /// Info about the file behind an active stream; the download can't
    /// start without it.
    PleaseUploadAck { stream_id: String, info: FileInfo },
}

// ── Shared payloads ──────────────────────────────────────────────────

/// A file offered by a sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

/// Name and size of the file behind a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

// ── Transfer routes ──────────────────────────────────────────────────

/// Path a sender POSTs file bytes to once asked via `PleaseUpload`.
pub fn upload_path(stream_id: &str) -> String {
    format!("/api/upload/{stream_id}")
}

/// Path a receiver GETs to download `file_id` from `sender_id`.  The
/// trailing name only drives the response content type.
pub fn download_path(sender_id: &str, file_id: &str, name: &str) -> String {
    format!("/api/download/{sender_id}/{file_id}/called/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_without_id_serializes_null() {
        let json = serde_json::to_string(&ReceiverToServer::Handshake {
            id: None,
            sender_id: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"Handshake","id":null}"#);

        let json = serde_json::to_string(&SenderToServer::Handshake { id: None }).unwrap();
        assert_eq!(json, r#"{"type":"Handshake","id":null}"#);
    }

    #[test]
    fn receiver_handshake_names_sender() {
        let msg = ReceiverToServer::Handshake {
            id: Some("r1".into()),
            sender_id: Some("snd".into()),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"Handshake","id":"r1","sender_id":"snd"}"#);

        let back: ReceiverToServer =
            serde_json::from_str(r#"{"type":"Handshake","id":null}"#).unwrap();
        assert_eq!(
            back,
            ReceiverToServer::Handshake {
                id: None,
                sender_id: None
            }
        );
    }

    #[test]
    fn please_file_list_is_bare_tag() {
        let json = serde_json::to_string(&ReceiverToServer::PleaseFileList).unwrap();
        assert_eq!(json, r#"{"type":"PleaseFileList"}"#);
    }

    #[test]
    fn receiver_parses_file_list() {
        let raw = r#"{"type":"FileList","files":[{"id":"a","name":"notes.txt","size":12}]}"#;
        let msg: ServerToReceiver = serde_json::from_str(raw).unwrap();
        assert_eq!(
            msg,
            ServerToReceiver::FileList {
                files: vec![File {
                    id: "a".into(),
                    name: "notes.txt".into(),
                    size: 12,
                }],
            }
        );
    }

    #[test]
    fn sender_parses_please_file_list() {
        let raw = r#"{"type":"PleaseFileList","receiver_id":"r1"}"#;
        let msg: ServerToSender = serde_json::from_str(raw).unwrap();
        assert_eq!(
            msg,
            ServerToSender::PleaseFileList {
                receiver_id: "r1".into()
            }
        );
    }

    #[test]
    fn upload_ack_nests_file_info() {
        let msg = SenderToServer::PleaseUploadAck {
            stream_id: "s1".into(),
            info: FileInfo {
                name: "a.bin".into(),
                size: 4,
            },
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "PleaseUploadAck");
        assert_eq!(value["info"]["name"], "a.bin");
        assert_eq!(value["info"]["size"], 4);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let raw = r#"{"type":"Nope"}"#;
        assert!(serde_json::from_str::<ServerToReceiver>(raw).is_err());
    }

    #[test]
    fn transfer_paths() {
        assert_eq!(upload_path("s1"), "/api/upload/s1");
        assert_eq!(
            download_path("snd", "f1", "a.txt"),
            "/api/download/snd/f1/called/a.txt"
        );
    }
}
