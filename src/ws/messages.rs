//! WebSocket message types: envelope, commands, and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast event.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands that a client can send over WebSocket.
///
/// Tip amounts travel as string-encoded decimals; an unparsable amount is
/// treated as missing and skipped silently like the rest of the tip
/// validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Join a live session as a viewer.
    Join {
        /// Target session ID.
        session_id: uuid::Uuid,
    },
    /// Leave a session. Idempotent.
    Leave {
        /// Target session ID.
        session_id: uuid::Uuid,
    },
    /// Post a chat message to a session.
    Chat {
        /// Target session ID.
        session_id: uuid::Uuid,
        /// Message text.
        text: String,
    },
    /// Tip the artist during a session.
    Tip {
        /// Target session ID.
        session_id: uuid::Uuid,
        /// Tip amount (string-encoded decimal).
        #[serde(default)]
        amount: Option<String>,
        /// Currency tag; defaults to `"SOL"`.
        #[serde(default)]
        currency: Option<String>,
        /// Payment proof signature from the client's wallet.
        #[serde(default)]
        proof_signature: Option<String>,
    },
    /// Subscribe to broadcast topics. `"*"` enables the wildcard.
    Subscribe {
        /// Topic strings (e.g. `"token:<uuid>"`).
        topics: Vec<String>,
    },
    /// Unsubscribe from broadcast topics.
    Unsubscribe {
        /// Topic strings.
        topics: Vec<String>,
    },
}
