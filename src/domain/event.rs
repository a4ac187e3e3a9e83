//! Domain events broadcast to realtime subscribers.
//!
//! Every state change the realtime layer cares about emits a
//! [`StreamEvent`] through the [`super::EventBus`]. Events are tagged with
//! a topic string; WebSocket connections filter on the topics they are
//! subscribed to.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{CallerIdentity, SessionId, TokenId};

/// Domain event emitted after a realtime-relevant state mutation.
///
/// Amounts are stored as `String` to keep full decimal precision on the
/// wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Emitted whenever a session's viewer count changes.
    ViewerCount {
        /// Session identifier.
        session_id: SessionId,
        /// New viewer count.
        count: u32,
        /// Emission timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a chat message is posted to a live session.
    ChatMessage {
        /// Session identifier.
        session_id: SessionId,
        /// Store-assigned message ID.
        message_id: i64,
        /// Public identity of the author.
        author: CallerIdentity,
        /// Message text.
        content: String,
        /// When the message was sent.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a viewer tips during a live session.
    Tip {
        /// Session identifier.
        session_id: SessionId,
        /// Store-assigned message ID of the tip record.
        message_id: i64,
        /// Public identity of the tipper.
        author: CallerIdentity,
        /// Tip amount (string-encoded decimal).
        amount: String,
        /// Currency tag.
        currency: String,
        /// When the tip was sent.
        timestamp: DateTime<Utc>,
    },

    /// Emitted once when a token graduates to pooled-liquidity trading.
    Graduation {
        /// Token identifier.
        token_id: TokenId,
        /// Ticker symbol.
        symbol: String,
        /// Token name.
        name: String,
        /// Always `true` on emission; included for client convenience.
        graduated: bool,
        /// External address of the new pool.
        pool_address: String,
        /// When graduation committed.
        timestamp: DateTime<Utc>,
    },
}

impl StreamEvent {
    /// Returns the broadcast topic this event belongs to.
    ///
    /// Session-scoped events use `session:{id}`; token-scoped events use
    /// `token:{id}`.
    #[must_use]
    pub fn topic(&self) -> String {
        match self {
            Self::ViewerCount { session_id, .. }
            | Self::ChatMessage { session_id, .. }
            | Self::Tip { session_id, .. } => format!("session:{session_id}"),
            Self::Graduation { token_id, .. } => format!("token:{token_id}"),
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ViewerCount { .. } => "viewer_count",
            Self::ChatMessage { .. } => "chat_message",
            Self::Tip { .. } => "tip",
            Self::Graduation { .. } => "graduation",
        }
    }
}

/// Builds the broadcast topic string for a session.
#[must_use]
pub fn session_topic(session_id: SessionId) -> String {
    format!("session:{session_id}")
}

/// Builds the broadcast topic string for a token's trading channel.
#[must_use]
pub fn token_topic(token_id: TokenId) -> String {
    format!("token:{token_id}")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    #[test]
    fn viewer_count_topic_is_session_scoped() {
        let session_id = SessionId::new();
        let event = StreamEvent::ViewerCount {
            session_id,
            count: 5,
            timestamp: Utc::now(),
        };
        assert_eq!(event.topic(), format!("session:{session_id}"));
        assert_eq!(event.topic(), session_topic(session_id));
        assert_eq!(event.event_type_str(), "viewer_count");
    }

    #[test]
    fn graduation_topic_is_token_scoped() {
        let token_id = TokenId::new();
        let event = StreamEvent::Graduation {
            token_id,
            symbol: "NOVA".to_string(),
            name: "Nova Sky".to_string(),
            graduated: true,
            pool_address: "LP-test".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.topic(), token_topic(token_id));
        assert_eq!(event.event_type_str(), "graduation");
    }

    #[test]
    fn tip_event_serializes_with_tag() {
        let event = StreamEvent::Tip {
            session_id: SessionId::new(),
            message_id: 7,
            author: CallerIdentity::new(UserId::new(), "fan01"),
            amount: "2.5".to_string(),
            currency: "SOL".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event);
        assert!(json.is_ok());
        let json_str = json.unwrap_or_default();
        assert!(json_str.contains("\"event_type\":\"tip\""));
        assert!(json_str.contains("2.5"));
    }
}
