//! Persistence layer: durable storage for sessions, chat, tokens, pools.
//!
//! [`StreamStore`] is the seam between the services and storage. Two
//! implementations ship: [`memory::MemoryStore`] for single-process
//! deployments and tests, and [`postgres::PostgresStore`] for durable
//! multi-process deployments. Every mutation a store exposes is atomic at
//! the single-record level; viewer-count changes and the graduation claim
//! are expressed as conditional updates rather than read-modify-write.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::chat::TipDetails;
use crate::domain::{
    ArtistToken, CallerIdentity, ChatMessage, LiquidityPool, LivestreamSession, SessionId,
    SessionStatus, TokenId,
};
use crate::error::GatewayError;

/// A chat message about to be persisted; the store assigns the ID.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// Who sent it.
    pub author: CallerIdentity,
    /// Message text (synthesized for tips).
    pub content: String,
    /// Tip details when the message is a tip.
    pub tip: Option<TipDetails>,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
}

/// Durable record store used by the session and graduation services.
///
/// Implementations must guarantee that [`adjust_viewer_count`] and
/// [`claim_graduation`] are atomic with respect to concurrent callers:
/// the viewer count never loses an update and at most one caller ever
/// wins a graduation claim.
///
/// [`adjust_viewer_count`]: StreamStore::adjust_viewer_count
/// [`claim_graduation`]: StreamStore::claim_graduation
#[async_trait]
pub trait StreamStore: std::fmt::Debug + Send + Sync {
    /// Inserts a new session record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if a session with the same
    /// ID already exists, or [`GatewayError::PersistenceError`] on store
    /// failure.
    async fn create_session(&self, session: LivestreamSession) -> Result<(), GatewayError>;

    /// Fetches a session by ID, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn get_session(&self, id: SessionId) -> Result<Option<LivestreamSession>, GatewayError>;

    /// Lists all sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn list_sessions(&self) -> Result<Vec<LivestreamSession>, GatewayError>;

    /// Applies a lifecycle transition, stamping `started_at`/`ended_at`
    /// and resetting the viewer count to zero on end.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`] if the session is absent,
    /// [`GatewayError::InvalidTransition`] if the move is not allowed from
    /// the current status, or [`GatewayError::PersistenceError`] on store
    /// failure.
    async fn set_session_status(
        &self,
        id: SessionId,
        status: SessionStatus,
    ) -> Result<LivestreamSession, GatewayError>;

    /// Atomically adjusts the viewer count of a live session by `delta`,
    /// flooring at zero. Returns the new count.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`] if the session is absent,
    /// [`GatewayError::SessionNotLive`] if it exists but is not live, or
    /// [`GatewayError::PersistenceError`] on store failure.
    async fn adjust_viewer_count(&self, id: SessionId, delta: i32) -> Result<u32, GatewayError>;

    /// Persists a chat message, assigning its ID.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn insert_chat_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessage, GatewayError>;

    /// Returns the most recent `limit` messages for a session in
    /// ascending (`sent_at`, `id`) order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn chat_history(
        &self,
        id: SessionId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, GatewayError>;

    /// Inserts a new token record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if a token with the same
    /// ID already exists, or [`GatewayError::PersistenceError`] on store
    /// failure.
    async fn create_token(&self, token: ArtistToken) -> Result<(), GatewayError>;

    /// Fetches a token by ID, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn get_token(&self, id: TokenId) -> Result<Option<ArtistToken>, GatewayError>;

    /// Lists all tokens, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn list_tokens(&self) -> Result<Vec<ArtistToken>, GatewayError>;

    /// Overwrites a token's market cap with the indexer-derived value.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::TokenNotFound`] if the token is absent, or
    /// [`GatewayError::PersistenceError`] on store failure.
    async fn set_market_cap(
        &self,
        id: TokenId,
        market_cap: Decimal,
    ) -> Result<ArtistToken, GatewayError>;

    /// Conditionally marks the token graduated. Succeeds (`true`) only for
    /// the first caller; a token that is already graduated returns `false`.
    ///
    /// This is the serialization point for concurrent graduation
    /// evaluations.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::TokenNotFound`] if the token is absent, or
    /// [`GatewayError::PersistenceError`] on store failure.
    async fn claim_graduation(&self, id: TokenId, at: DateTime<Utc>) -> Result<bool, GatewayError>;

    /// Compensating rollback: clears `graduated` and `graduation_date`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn revert_graduation(&self, id: TokenId) -> Result<(), GatewayError>;

    /// Inserts the liquidity pool record for a graduated token. At most
    /// one pool may exist per token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if a pool already exists
    /// for the token or on store failure.
    async fn insert_liquidity_pool(&self, pool: LiquidityPool) -> Result<(), GatewayError>;

    /// Fetches the pool backing a token, or `None` if ungraduated.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on store failure.
    async fn pool_for_token(
        &self,
        token_id: TokenId,
    ) -> Result<Option<LiquidityPool>, GatewayError>;
}
