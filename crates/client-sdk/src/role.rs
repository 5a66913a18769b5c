//! Role resolution from the page address.
//!
//! A page with a non-empty `id` query parameter is a receiver asking for
//! that sender's files; every other page is a sender.  Resolution happens
//! once at startup and the result never changes.

use std::collections::HashMap;
use std::fmt;

use fs_protocol::{RECEIVER_WS_PATH, SENDER_WS_PATH};
use url::Url;

use crate::types::ClientError;

/// Environment variable holding the page address.
pub const PAGE_URL_ENV: &str = "FS_PAGE_URL";

/// Which side of the transfer this page plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    /// Path segment used in the WebSocket endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Sender => "sender",
            Role::Receiver => "receiver",
        }
    }

    pub fn ws_path(&self) -> &'static str {
        match self {
            Role::Sender => SENDER_WS_PATH,
            Role::Receiver => RECEIVER_WS_PATH,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The page address the client was started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    secure: bool,
    authority: String,
    query: String,
}

impl PageLocation {
    /// Parse a page address such as `http://host:8080/?id=abc`.
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        let url = Url::parse(raw.trim())
            .map_err(|e| ClientError::Location(format!("invalid page url {raw:?}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| ClientError::Location(format!("page url {raw:?} has no host")))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            secure: matches!(url.scheme(), "https" | "wss"),
            authority,
            query: url.query().unwrap_or_default().to_string(),
        })
    }

    /// Read the page address from [`PAGE_URL_ENV`].
    pub fn from_env() -> Result<Self, ClientError> {
        let raw = std::env::var(PAGE_URL_ENV).map_err(|_| {
            ClientError::Location(format!(
                "{PAGE_URL_ENV} is not set; can't tell whether this is a sender or a receiver"
            ))
        })?;
        Self::parse(&raw)
    }

    /// `host[:port]` of the page.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Split a raw query string into key/value pairs.
///
/// Pieces are split on `&` and then `=`; a piece without `=` maps to an
/// empty value, and a repeated key keeps its last value.  Nothing is
/// percent-decoded.
pub fn parse_query(raw: &str) -> HashMap<String, String> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut out = HashMap::new();
    for piece in raw.split('&') {
        let mut parts = piece.trim().split('=');
        let key = parts.next().unwrap_or_default();
        let value = parts.next().unwrap_or_default();
        out.insert(key.to_string(), value.to_string());
    }
    out
}

/// Resolved role, plus the sender a receiver wants to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    role: Role,
    peer_id: Option<String>,
}

impl Mode {
    pub fn resolve(location: &PageLocation) -> Self {
        match parse_query(location.query()).remove("id") {
            Some(id) if !id.is_empty() => Self {
                role: Role::Receiver,
                peer_id: Some(id),
            },
            _ => Self {
                role: Role::Sender,
                peer_id: None,
            },
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_sender(&self) -> bool {
        self.role == Role::Sender
    }

    pub fn is_receiver(&self) -> bool {
        self.role == Role::Receiver
    }

    /// The sender ID a receiver page was opened for.
    pub fn peer_id(&self) -> Option<&str> {
        self.peer_id.as_deref()
    }

    /// `ws(s)://<host>/api/<role>/ws` for this page.
    pub fn endpoint_url(&self, location: &PageLocation) -> String {
        let scheme = if location.is_secure() { "wss" } else { "ws" };
        format!(
            "{scheme}://{}{}",
            location.authority(),
            self.role.ws_path()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_for(url: &str) -> Mode {
        Mode::resolve(&PageLocation::parse(url).unwrap())
    }

    #[test]
    fn id_param_makes_receiver() {
        let mode = mode_for("http://localhost:8080/?id=abc123");
        assert_eq!(mode.role(), Role::Receiver);
        assert!(mode.is_receiver());
        assert!(!mode.is_sender());
        assert_eq!(mode.peer_id(), Some("abc123"));
    }

    #[test]
    fn missing_id_makes_sender() {
        let mode = mode_for("http://localhost:8080/");
        assert_eq!(mode.role(), Role::Sender);
        assert!(mode.is_sender());
        assert_eq!(mode.peer_id(), None);
    }

    #[test]
    fn empty_id_makes_sender() {
        assert!(mode_for("http://localhost/?id=").is_sender());
        assert!(mode_for("http://localhost/?id").is_sender());
    }

    #[test]
    fn malformed_query_does_not_crash() {
        assert!(mode_for("http://localhost/?foo&&=&bar=1").is_sender());
        let mode = mode_for("http://localhost/?foo&id=xyz");
        assert_eq!(mode.peer_id(), Some("xyz"));
    }

    #[test]
    fn last_duplicate_wins() {
        let q = parse_query("?id=first&id=second");
        assert_eq!(q.get("id").map(String::as_str), Some("second"));
    }

    #[test]
    fn extra_equals_keeps_second_piece() {
        let q = parse_query("id=a=b");
        assert_eq!(q.get("id").map(String::as_str), Some("a"));
    }

    #[test]
    fn values_are_not_decoded() {
        let q = parse_query("id=a%20b");
        assert_eq!(q.get("id").map(String::as_str), Some("a%20b"));
    }

    #[test]
    fn endpoint_follows_role_and_scheme() {
        let loc = PageLocation::parse("http://example.com:3030/?id=s1").unwrap();
        assert_eq!(
            Mode::resolve(&loc).endpoint_url(&loc),
            "ws://example.com:3030/api/receiver/ws"
        );

        let loc = PageLocation::parse("https://example.com/").unwrap();
        assert_eq!(
            Mode::resolve(&loc).endpoint_url(&loc),
            "wss://example.com/api/sender/ws"
        );
    }

    #[test]
    fn location_without_host_is_fatal() {
        let err = PageLocation::parse("file:///tmp/index.html").unwrap_err();
        assert!(matches!(err, ClientError::Location(_)));
        assert!(PageLocation::parse("not a url").is_err());
    }
}
