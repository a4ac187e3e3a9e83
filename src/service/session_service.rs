//! Livestream session manager: viewer membership, chat, and tips.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::chat::TipDetails;
use crate::domain::event::StreamEvent;
use crate::domain::{
    CallerIdentity, ChatMessage, EventBus, LivestreamSession, SessionId, SessionStatus, UserId,
};
use crate::error::GatewayError;
use crate::persistence::{NewChatMessage, StreamStore};

/// Orchestrates livestream session operations and relays realtime events.
///
/// Viewer-count changes go through the store's atomic delta operation;
/// the service never reads-modifies-writes a count. Malformed chat and
/// tip input is skipped silently: the platform's clients send
/// fire-and-forget messages with no error channel for them.
#[derive(Debug, Clone)]
pub struct SessionService {
    store: Arc<dyn StreamStore>,
    event_bus: EventBus,
}

impl SessionService {
    /// Creates a new `SessionService`.
    #[must_use]
    pub fn new(store: Arc<dyn StreamStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns a reference to the inner store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn StreamStore> {
        &self.store
    }

    /// Creates a new scheduled session.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the session ID is already taken or
    /// the store fails.
    pub async fn create_session(
        &self,
        id: Option<SessionId>,
        artist_id: UserId,
        title: &str,
    ) -> Result<LivestreamSession, GatewayError> {
        if title.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "session title must not be empty".to_string(),
            ));
        }
        let session =
            LivestreamSession::new(id.unwrap_or_else(SessionId::new), artist_id, title.trim());
        let created = session.clone();
        self.store.create_session(session).await?;
        tracing::info!(session_id = %created.id, artist_id = %created.artist_id, "session created");
        Ok(created)
    }

    /// Transitions a scheduled session to live.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the session is missing or not in a
    /// startable state.
    pub async fn start_session(&self, id: SessionId) -> Result<LivestreamSession, GatewayError> {
        let session = self
            .store
            .set_session_status(id, SessionStatus::Live)
            .await?;
        tracing::info!(session_id = %id, "session live");
        Ok(session)
    }

    /// Ends a live session, resetting its viewer count.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the session is missing or not live.
    pub async fn stop_session(&self, id: SessionId) -> Result<LivestreamSession, GatewayError> {
        let session = self
            .store
            .set_session_status(id, SessionStatus::Ended)
            .await?;
        tracing::info!(session_id = %id, "session ended");
        Ok(session)
    }

    /// Registers a viewer joining a live session.
    ///
    /// Increments the viewer count by an atomic delta and broadcasts the
    /// new count to the session topic. Topic membership itself is managed
    /// by the connection layer.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`] if the session is
    /// unknown, or [`GatewayError::SessionNotLive`] if it is not
    /// currently broadcasting.
    pub async fn join(&self, session_id: SessionId, user_id: UserId) -> Result<u32, GatewayError> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(GatewayError::SessionNotFound(*session_id.as_uuid()))?;
        if !session.is_live() {
            return Err(GatewayError::SessionNotLive(*session_id.as_uuid()));
        }

        let count = self.store.adjust_viewer_count(session_id, 1).await?;
        let _ = self.event_bus.publish(StreamEvent::ViewerCount {
            session_id,
            count,
            timestamp: Utc::now(),
        });
        tracing::debug!(%session_id, %user_id, count, "viewer joined");
        Ok(count)
    }

    /// Registers a viewer leaving a session. Idempotent and infallible:
    /// an unknown or already-ended session is a no-op, and store failures
    /// are logged rather than surfaced — the connection is going away
    /// either way.
    pub async fn leave(&self, session_id: SessionId, user_id: UserId) {
        match self.store.adjust_viewer_count(session_id, -1).await {
            Ok(count) => {
                let _ = self.event_bus.publish(StreamEvent::ViewerCount {
                    session_id,
                    count,
                    timestamp: Utc::now(),
                });
                tracing::debug!(%session_id, %user_id, count, "viewer left");
            }
            Err(GatewayError::SessionNotFound(_) | GatewayError::SessionNotLive(_)) => {}
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "viewer count decrement failed");
            }
        }
    }

    /// Posts a chat message to a session.
    ///
    /// Returns `Ok(None)` without persisting anything when the caller is
    /// anonymous, the session is unknown, or the text trims to empty.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] only on store failure.
    pub async fn send_chat(
        &self,
        session_id: SessionId,
        identity: Option<&CallerIdentity>,
        text: &str,
    ) -> Result<Option<ChatMessage>, GatewayError> {
        let Some(author) = identity else {
            return Ok(None);
        };
        let content = text.trim();
        if content.is_empty() {
            return Ok(None);
        }
        if self.store.get_session(session_id).await?.is_none() {
            return Ok(None);
        }

        let message = self
            .store
            .insert_chat_message(NewChatMessage {
                session_id,
                author: author.clone(),
                content: content.to_string(),
                tip: None,
                sent_at: Utc::now(),
            })
            .await?;

        let _ = self.event_bus.publish(StreamEvent::ChatMessage {
            session_id,
            message_id: message.id,
            author: message.author.clone(),
            content: message.content.clone(),
            timestamp: message.sent_at,
        });
        Ok(Some(message))
    }

    /// Posts a tip to a session.
    ///
    /// Returns `Ok(None)` without persisting anything when the caller is
    /// anonymous, the session is unknown, or the amount or payment proof
    /// is missing or non-positive. Verification of the proof against the
    /// external ledger happens upstream; the gateway only requires its
    /// presence.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] only on store failure.
    pub async fn send_tip(
        &self,
        session_id: SessionId,
        identity: Option<&CallerIdentity>,
        amount: Option<Decimal>,
        currency: &str,
        proof_signature: Option<&str>,
    ) -> Result<Option<ChatMessage>, GatewayError> {
        let Some(author) = identity else {
            return Ok(None);
        };
        let Some(amount) = amount else {
            return Ok(None);
        };
        if amount <= Decimal::ZERO {
            return Ok(None);
        }
        if proof_signature.is_none_or(|sig| sig.trim().is_empty()) {
            return Ok(None);
        }
        if self.store.get_session(session_id).await?.is_none() {
            return Ok(None);
        }

        let message = self
            .store
            .insert_chat_message(NewChatMessage {
                session_id,
                author: author.clone(),
                content: ChatMessage::tip_content(amount, currency),
                tip: Some(TipDetails {
                    amount,
                    currency: currency.to_string(),
                }),
                sent_at: Utc::now(),
            })
            .await?;

        let _ = self.event_bus.publish(StreamEvent::Tip {
            session_id,
            message_id: message.id,
            author: message.author.clone(),
            amount: amount.to_string(),
            currency: currency.to_string(),
            timestamp: message.sent_at,
        });
        tracing::info!(%session_id, %amount, currency, "tip received");
        Ok(Some(message))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::memory::MemoryStore;
    use rust_decimal_macros::dec;

    fn make_service() -> SessionService {
        let store: Arc<dyn StreamStore> = Arc::new(MemoryStore::new());
        SessionService::new(store, EventBus::new(1000))
    }

    async fn live_session(service: &SessionService) -> SessionId {
        let Ok(session) = service
            .create_session(None, UserId::new(), "listening party")
            .await
        else {
            panic!("create failed");
        };
        let Ok(_) = service.start_session(session.id).await else {
            panic!("start failed");
        };
        session.id
    }

    fn identity() -> CallerIdentity {
        CallerIdentity::new(UserId::new(), "fan01").with_wallet("9xQe...k3Pb")
    }

    #[tokio::test]
    async fn join_live_session_increments_and_emits() {
        let service = make_service();
        let session_id = live_session(&service).await;

        // Seed four existing viewers.
        for _ in 0..4 {
            let _ = service.store().adjust_viewer_count(session_id, 1).await;
        }

        let mut rx = service.event_bus().subscribe();
        let Ok(count) = service.join(session_id, UserId::new()).await else {
            panic!("join failed");
        };
        assert_eq!(count, 5);

        let Ok(StreamEvent::ViewerCount { count, .. }) = rx.recv().await else {
            panic!("expected viewer_count event");
        };
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn join_unknown_session_fails() {
        let service = make_service();
        let result = service.join(SessionId::new(), UserId::new()).await;
        assert!(matches!(result, Err(GatewayError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn join_scheduled_session_rejected() {
        let service = make_service();
        let Ok(session) = service.create_session(None, UserId::new(), "soon").await else {
            panic!("create failed");
        };
        let result = service.join(session.id, UserId::new()).await;
        assert!(matches!(result, Err(GatewayError::SessionNotLive(_))));
    }

    #[tokio::test]
    async fn join_leave_balance() {
        let service = make_service();
        let session_id = live_session(&service).await;
        let user = UserId::new();

        for _ in 0..3 {
            let _ = service.join(session_id, user).await;
        }
        service.leave(session_id, user).await;

        let Ok(Some(session)) = service.store().get_session(session_id).await else {
            panic!("session missing");
        };
        assert_eq!(session.viewer_count, 2);
    }

    #[tokio::test]
    async fn leave_is_idempotent_on_unknown_session() {
        let service = make_service();
        // Must not panic or error.
        service.leave(SessionId::new(), UserId::new()).await;
    }

    #[tokio::test]
    async fn leave_floors_at_zero() {
        let service = make_service();
        let session_id = live_session(&service).await;
        let user = UserId::new();

        service.leave(session_id, user).await;
        service.leave(session_id, user).await;

        let Ok(Some(session)) = service.store().get_session(session_id).await else {
            panic!("session missing");
        };
        assert_eq!(session.viewer_count, 0);
    }

    #[tokio::test]
    async fn chat_persists_and_emits() {
        let service = make_service();
        let session_id = live_session(&service).await;
        let author = identity();
        let mut rx = service.event_bus().subscribe();

        let Ok(Some(message)) = service
            .send_chat(session_id, Some(&author), "  hello encore  ")
            .await
        else {
            panic!("chat failed");
        };
        assert_eq!(message.content, "hello encore");
        assert!(!message.is_tip());

        let Ok(StreamEvent::ChatMessage { content, .. }) = rx.recv().await else {
            panic!("expected chat_message event");
        };
        assert_eq!(content, "hello encore");
    }

    #[tokio::test]
    async fn empty_chat_is_silently_skipped() {
        let service = make_service();
        let session_id = live_session(&service).await;
        let author = identity();

        let Ok(result) = service.send_chat(session_id, Some(&author), "   ").await else {
            panic!("chat errored");
        };
        assert!(result.is_none());

        let Ok(history) = service.store().chat_history(session_id, 10).await else {
            panic!("history failed");
        };
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn anonymous_chat_is_silently_skipped() {
        let service = make_service();
        let session_id = live_session(&service).await;

        let Ok(result) = service.send_chat(session_id, None, "hello").await else {
            panic!("chat errored");
        };
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn chat_to_unknown_session_is_silently_skipped() {
        let service = make_service();
        let author = identity();
        let Ok(result) = service
            .send_chat(SessionId::new(), Some(&author), "hello")
            .await
        else {
            panic!("chat errored");
        };
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn tip_persists_with_synthesized_content() {
        let service = make_service();
        let session_id = live_session(&service).await;
        let author = identity();
        let mut rx = service.event_bus().subscribe();

        let Ok(Some(message)) = service
            .send_tip(session_id, Some(&author), Some(dec!(2.5)), "SOL", Some("sig"))
            .await
        else {
            panic!("tip failed");
        };
        assert_eq!(message.content, "Tipped 2.5 SOL");
        assert!(message.is_tip());

        let Ok(StreamEvent::Tip { amount, currency, .. }) = rx.recv().await else {
            panic!("expected tip event");
        };
        assert_eq!(amount, "2.5");
        assert_eq!(currency, "SOL");
    }

    #[tokio::test]
    async fn tip_without_amount_or_proof_is_skipped() {
        let service = make_service();
        let session_id = live_session(&service).await;
        let author = identity();

        let Ok(no_amount) = service
            .send_tip(session_id, Some(&author), None, "SOL", Some("sig"))
            .await
        else {
            panic!("tip errored");
        };
        assert!(no_amount.is_none());

        let Ok(no_proof) = service
            .send_tip(session_id, Some(&author), Some(dec!(1)), "SOL", None)
            .await
        else {
            panic!("tip errored");
        };
        assert!(no_proof.is_none());

        let Ok(history) = service.store().chat_history(session_id, 10).await else {
            panic!("history failed");
        };
        assert!(history.is_empty());
    }
}
