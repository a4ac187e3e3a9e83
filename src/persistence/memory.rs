//! In-memory implementation of [`StreamStore`].
//!
//! Stores records in `HashMap`s where each session/token entry is
//! individually protected by a [`tokio::sync::RwLock`]. The outer map lock
//! is held only for lookup; count adjustments and the graduation claim
//! take the per-entry write lock, so concurrent mutations on different
//! records never contend and mutations on the same record are serialized.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::{NewChatMessage, StreamStore};
use crate::domain::{
    ArtistToken, ChatMessage, LiquidityPool, LivestreamSession, SessionId, SessionStatus, TokenId,
};
use crate::error::GatewayError;

/// Process-local store backing tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, Arc<RwLock<LivestreamSession>>>>,
    messages: RwLock<HashMap<SessionId, Vec<ChatMessage>>>,
    next_message_id: AtomicI64,
    tokens: RwLock<HashMap<TokenId, Arc<RwLock<ArtistToken>>>>,
    pools: RwLock<HashMap<TokenId, LiquidityPool>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn session_entry(
        &self,
        id: SessionId,
    ) -> Result<Arc<RwLock<LivestreamSession>>, GatewayError> {
        let map = self.sessions.read().await;
        map.get(&id)
            .cloned()
            .ok_or(GatewayError::SessionNotFound(*id.as_uuid()))
    }

    async fn token_entry(&self, id: TokenId) -> Result<Arc<RwLock<ArtistToken>>, GatewayError> {
        let map = self.tokens.read().await;
        map.get(&id)
            .cloned()
            .ok_or(GatewayError::TokenNotFound(*id.as_uuid()))
    }
}

#[async_trait]
impl StreamStore for MemoryStore {
    async fn create_session(&self, session: LivestreamSession) -> Result<(), GatewayError> {
        let mut map = self.sessions.write().await;
        if map.contains_key(&session.id) {
            return Err(GatewayError::InvalidRequest(format!(
                "session {} already exists",
                session.id
            )));
        }
        map.insert(session.id, Arc::new(RwLock::new(session)));
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<LivestreamSession>, GatewayError> {
        let map = self.sessions.read().await;
        let Some(entry) = map.get(&id) else {
            return Ok(None);
        };
        Ok(Some(entry.read().await.clone()))
    }

    async fn list_sessions(&self) -> Result<Vec<LivestreamSession>, GatewayError> {
        let map = self.sessions.read().await;
        let mut sessions = Vec::with_capacity(map.len());
        for entry in map.values() {
            sessions.push(entry.read().await.clone());
        }
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn set_session_status(
        &self,
        id: SessionId,
        status: SessionStatus,
    ) -> Result<LivestreamSession, GatewayError> {
        let entry = self.session_entry(id).await?;
        let mut session = entry.write().await;
        if !session.can_transition_to(status) {
            return Err(GatewayError::InvalidTransition(format!(
                "{} -> {}",
                session.status.as_str(),
                status.as_str()
            )));
        }
        session.status = status;
        match status {
            SessionStatus::Live => session.started_at = Some(Utc::now()),
            SessionStatus::Ended => {
                session.ended_at = Some(Utc::now());
                session.viewer_count = 0;
            }
            SessionStatus::Scheduled => {}
        }
        Ok(session.clone())
    }

    async fn adjust_viewer_count(&self, id: SessionId, delta: i32) -> Result<u32, GatewayError> {
        let entry = self.session_entry(id).await?;
        let mut session = entry.write().await;
        if !session.is_live() {
            return Err(GatewayError::SessionNotLive(*id.as_uuid()));
        }
        session.viewer_count = if delta.is_negative() {
            session.viewer_count.saturating_sub(delta.unsigned_abs())
        } else {
            session.viewer_count.saturating_add(delta.unsigned_abs())
        };
        Ok(session.viewer_count)
    }

    async fn insert_chat_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessage, GatewayError> {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = ChatMessage {
            id,
            session_id: message.session_id,
            author: message.author,
            content: message.content,
            tip: message.tip,
            sent_at: message.sent_at,
        };
        let mut map = self.messages.write().await;
        map.entry(message.session_id)
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn chat_history(
        &self,
        id: SessionId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, GatewayError> {
        let map = self.messages.read().await;
        let mut history = map.get(&id).cloned().unwrap_or_default();
        history.sort_by(|a, b| a.sent_at.cmp(&b.sent_at).then(a.id.cmp(&b.id)));
        let excess = history.len().saturating_sub(limit as usize);
        Ok(history.split_off(excess))
    }

    async fn create_token(&self, token: ArtistToken) -> Result<(), GatewayError> {
        let mut map = self.tokens.write().await;
        if map.contains_key(&token.id) {
            return Err(GatewayError::InvalidRequest(format!(
                "token {} already exists",
                token.id
            )));
        }
        map.insert(token.id, Arc::new(RwLock::new(token)));
        Ok(())
    }

    async fn get_token(&self, id: TokenId) -> Result<Option<ArtistToken>, GatewayError> {
        let map = self.tokens.read().await;
        let Some(entry) = map.get(&id) else {
            return Ok(None);
        };
        Ok(Some(entry.read().await.clone()))
    }

    async fn list_tokens(&self) -> Result<Vec<ArtistToken>, GatewayError> {
        let map = self.tokens.read().await;
        let mut tokens = Vec::with_capacity(map.len());
        for entry in map.values() {
            tokens.push(entry.read().await.clone());
        }
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tokens)
    }

    async fn set_market_cap(
        &self,
        id: TokenId,
        market_cap: Decimal,
    ) -> Result<ArtistToken, GatewayError> {
        let entry = self.token_entry(id).await?;
        let mut token = entry.write().await;
        token.market_cap = market_cap;
        Ok(token.clone())
    }

    async fn claim_graduation(&self, id: TokenId, at: DateTime<Utc>) -> Result<bool, GatewayError> {
        let entry = self.token_entry(id).await?;
        let mut token = entry.write().await;
        if token.graduated {
            return Ok(false);
        }
        token.graduated = true;
        token.graduation_date = Some(at);
        Ok(true)
    }

    async fn revert_graduation(&self, id: TokenId) -> Result<(), GatewayError> {
        // Rollback must be idempotent; a missing token is not a failure.
        let map = self.tokens.read().await;
        if let Some(entry) = map.get(&id) {
            let mut token = entry.write().await;
            token.graduated = false;
            token.graduation_date = None;
        }
        Ok(())
    }

    async fn insert_liquidity_pool(&self, pool: LiquidityPool) -> Result<(), GatewayError> {
        let mut map = self.pools.write().await;
        if map.contains_key(&pool.token_id) {
            return Err(GatewayError::PersistenceError(format!(
                "liquidity pool already exists for token {}",
                pool.token_id
            )));
        }
        map.insert(pool.token_id, pool);
        Ok(())
    }

    async fn pool_for_token(
        &self,
        token_id: TokenId,
    ) -> Result<Option<LiquidityPool>, GatewayError> {
        let map = self.pools.read().await;
        Ok(map.get(&token_id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{CallerIdentity, UserId};
    use rust_decimal_macros::dec;

    async fn live_session(store: &MemoryStore) -> SessionId {
        let session = LivestreamSession::new(SessionId::new(), UserId::new(), "test stream");
        let id = session.id;
        let Ok(()) = store.create_session(session).await else {
            panic!("create failed");
        };
        let Ok(_) = store.set_session_status(id, SessionStatus::Live).await else {
            panic!("start failed");
        };
        id
    }

    #[tokio::test]
    async fn create_and_get_session() {
        let store = MemoryStore::new();
        let session = LivestreamSession::new(SessionId::new(), UserId::new(), "test");
        let id = session.id;

        let result = store.create_session(session).await;
        assert!(result.is_ok());

        let fetched = store.get_session(id).await;
        let Ok(Some(fetched)) = fetched else {
            panic!("session not found");
        };
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.status, SessionStatus::Scheduled);
    }

    #[tokio::test]
    async fn duplicate_session_rejected() {
        let store = MemoryStore::new();
        let session = LivestreamSession::new(SessionId::new(), UserId::new(), "test");
        let dup = session.clone();

        let _ = store.create_session(session).await;
        let result = store.create_session(dup).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn viewer_count_deltas_floor_at_zero() {
        let store = MemoryStore::new();
        let id = live_session(&store).await;

        let Ok(count) = store.adjust_viewer_count(id, 1).await else {
            panic!("adjust failed");
        };
        assert_eq!(count, 1);

        let Ok(count) = store.adjust_viewer_count(id, -1).await else {
            panic!("adjust failed");
        };
        assert_eq!(count, 0);

        // Decrement below zero floors rather than wrapping.
        let Ok(count) = store.adjust_viewer_count(id, -1).await else {
            panic!("adjust failed");
        };
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn viewer_count_rejected_when_not_live() {
        let store = MemoryStore::new();
        let session = LivestreamSession::new(SessionId::new(), UserId::new(), "test");
        let id = session.id;
        let _ = store.create_session(session).await;

        let result = store.adjust_viewer_count(id, 1).await;
        assert!(matches!(result, Err(GatewayError::SessionNotLive(_))));
    }

    #[tokio::test]
    async fn ending_session_resets_viewer_count() {
        let store = MemoryStore::new();
        let id = live_session(&store).await;
        let _ = store.adjust_viewer_count(id, 3).await;

        let Ok(ended) = store.set_session_status(id, SessionStatus::Ended).await else {
            panic!("stop failed");
        };
        assert_eq!(ended.viewer_count, 0);
        assert!(ended.ended_at.is_some());
    }

    #[tokio::test]
    async fn illegal_transition_rejected() {
        let store = MemoryStore::new();
        let session = LivestreamSession::new(SessionId::new(), UserId::new(), "test");
        let id = session.id;
        let _ = store.create_session(session).await;

        let result = store.set_session_status(id, SessionStatus::Ended).await;
        assert!(matches!(result, Err(GatewayError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn chat_history_ordered_and_limited() {
        let store = MemoryStore::new();
        let id = live_session(&store).await;
        let author = CallerIdentity::new(UserId::new(), "fan01");

        for i in 0..5 {
            let _ = store
                .insert_chat_message(NewChatMessage {
                    session_id: id,
                    author: author.clone(),
                    content: format!("message {i}"),
                    tip: None,
                    sent_at: Utc::now(),
                })
                .await;
        }

        let Ok(history) = store.chat_history(id, 3).await else {
            panic!("history failed");
        };
        assert_eq!(history.len(), 3);
        // Most recent three, ascending by (sent_at, id).
        let ids: Vec<i64> = history.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn claim_graduation_wins_once() {
        let store = MemoryStore::new();
        let token = ArtistToken::new(TokenId::new(), "NOVA", "Nova Sky");
        let id = token.id;
        let _ = store.create_token(token).await;

        let now = Utc::now();
        let (first, second) = tokio::join!(
            store.claim_graduation(id, now),
            store.claim_graduation(id, now)
        );
        let (Ok(first), Ok(second)) = (first, second) else {
            panic!("claim failed");
        };
        assert_ne!(first, second, "exactly one claim must win");
    }

    #[tokio::test]
    async fn revert_clears_graduation() {
        let store = MemoryStore::new();
        let token = ArtistToken::new(TokenId::new(), "NOVA", "Nova Sky");
        let id = token.id;
        let _ = store.create_token(token).await;

        let _ = store.claim_graduation(id, Utc::now()).await;
        let Ok(()) = store.revert_graduation(id).await else {
            panic!("revert failed");
        };

        let Ok(Some(token)) = store.get_token(id).await else {
            panic!("token missing");
        };
        assert!(!token.graduated);
        assert!(token.graduation_date.is_none());
    }

    #[tokio::test]
    async fn one_pool_per_token() {
        let store = MemoryStore::new();
        let token_id = TokenId::new();

        let first = store
            .insert_liquidity_pool(LiquidityPool::for_graduation(token_id, "raydium"))
            .await;
        assert!(first.is_ok());

        let second = store
            .insert_liquidity_pool(LiquidityPool::for_graduation(token_id, "raydium"))
            .await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn set_market_cap_updates_token() {
        let store = MemoryStore::new();
        let token = ArtistToken::new(TokenId::new(), "NOVA", "Nova Sky");
        let id = token.id;
        let _ = store.create_token(token).await;

        let Ok(updated) = store.set_market_cap(id, dec!(42_000)).await else {
            panic!("update failed");
        };
        assert_eq!(updated.market_cap, dec!(42_000));
    }
}
