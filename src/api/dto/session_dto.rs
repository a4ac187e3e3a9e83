//! Session-related DTOs: create, detail, list, and chat history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::{ChatMessage, LivestreamSession};

/// Request body for `POST /sessions`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Optional explicit session ID (matches the platform's content
    /// record). Generated when omitted.
    #[serde(default)]
    pub session_id: Option<uuid::Uuid>,
    /// Artist hosting the stream.
    pub artist_id: uuid::Uuid,
    /// Stream title.
    pub title: String,
}

/// Session detail returned by create, start, stop, and get endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    /// Session identifier.
    pub session_id: uuid::Uuid,
    /// Artist hosting the stream.
    pub artist_id: uuid::Uuid,
    /// Stream title.
    pub title: String,
    /// Lifecycle status (`scheduled`, `live`, `ended`).
    pub status: String,
    /// Current viewer count.
    pub viewer_count: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the stream went live, if it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the stream ended, if it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<LivestreamSession> for SessionResponse {
    fn from(session: LivestreamSession) -> Self {
        Self {
            session_id: *session.id.as_uuid(),
            artist_id: *session.artist_id.as_uuid(),
            title: session.title,
            status: session.status.as_str().to_string(),
            viewer_count: session.viewer_count,
            created_at: session.created_at,
            started_at: session.started_at,
            ended_at: session.ended_at,
        }
    }
}

/// Paginated list response for `GET /sessions`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionListResponse {
    /// Session details for the requested page.
    pub data: Vec<SessionResponse>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// A chat message as returned by the history endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatMessageDto {
    /// Message ID.
    pub id: i64,
    /// Author's user ID.
    pub user_id: uuid::Uuid,
    /// Author's display name.
    pub display_name: String,
    /// Author's wallet identifier, when linked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    /// Message text.
    pub content: String,
    /// Tip amount (string-encoded decimal) when the message is a tip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip_amount: Option<String>,
    /// Tip currency when the message is a tip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip_currency: Option<String>,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
}

impl From<ChatMessage> for ChatMessageDto {
    fn from(message: ChatMessage) -> Self {
        let (tip_amount, tip_currency) = match message.tip {
            Some(tip) => (Some(tip.amount.to_string()), Some(tip.currency)),
            None => (None, None),
        };
        Self {
            id: message.id,
            user_id: *message.author.user_id.as_uuid(),
            display_name: message.author.display_name,
            wallet: message.author.wallet,
            content: message.content,
            tip_amount,
            tip_currency,
            sent_at: message.sent_at,
        }
    }
}

/// Response body for `GET /sessions/{id}/messages`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatHistoryResponse {
    /// Messages in ascending (`sent_at`, `id`) order.
    pub data: Vec<ChatMessageDto>,
}
