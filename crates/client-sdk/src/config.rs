use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reconnect::ReconnectBackoff;
use crate::types::ClientError;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

impl ClientConfig {
    /// Reject settings the channel cannot run with.
    pub fn validate(&self) -> Result<(), ClientError> {
        let r = &self.reconnect;
        if r.min_delay_ms == 0 {
            return Err(ClientError::Config(
                "reconnect.min_delay_ms must be greater than 0".into(),
            ));
        }
        if r.min_delay_ms > r.max_delay_ms {
            return Err(ClientError::Config(format!(
                "reconnect.min_delay_ms ({}) exceeds reconnect.max_delay_ms ({})",
                r.min_delay_ms, r.max_delay_ms
            )));
        }
        if self.channel.max_inbound_bytes == 0 {
            return Err(ClientError::Config(
                "channel.max_inbound_bytes must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reconnect
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// First retry delay, and the delay after any successful open.
    #[serde(default = "d_min_delay_ms")]
    pub min_delay_ms: u64,
    /// Cap on the doubling retry delay.
    #[serde(default = "d_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: d_min_delay_ms(),
            max_delay_ms: d_max_delay_ms(),
        }
    }
}

impl ReconnectConfig {
    pub fn backoff(&self) -> ReconnectBackoff {
        ReconnectBackoff {
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

fn d_min_delay_ms() -> u64 {
    1_000
}

fn d_max_delay_ms() -> u64 {
    10_000
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Channel
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Inbound text frames above this size are dropped.
    #[serde(default = "d_max_inbound_bytes")]
    pub max_inbound_bytes: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_inbound_bytes: d_max_inbound_bytes(),
        }
    }
}

fn d_max_inbound_bytes() -> usize {
    fs_protocol::MAX_FRAME_BYTES
}
