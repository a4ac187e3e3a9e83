//! Chat messages and tips relayed through a livestream session.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CallerIdentity, SessionId};

/// Tip attached to a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipDetails {
    /// Amount tipped, in `currency` units.
    pub amount: Decimal,
    /// Currency tag (e.g. `"SOL"`).
    pub currency: String,
}

/// A chat message persisted for a livestream session.
///
/// Immutable once created. History ordering is by `sent_at`, then `id`.
/// Tip-only messages carry a synthesized content string (see
/// [`ChatMessage::tip_content`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Store-assigned monotonic message ID.
    pub id: i64,
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// Who sent it.
    pub author: CallerIdentity,
    /// Message text. Synthesized for tips.
    pub content: String,
    /// Tip details when the message is a tip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<TipDetails>,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Returns `true` if this message carries a tip.
    #[must_use]
    pub const fn is_tip(&self) -> bool {
        self.tip.is_some()
    }

    /// Synthesizes the human-readable content string for a tip message.
    #[must_use]
    pub fn tip_content(amount: Decimal, currency: &str) -> String {
        format!("Tipped {amount} {currency}")
    }
}
