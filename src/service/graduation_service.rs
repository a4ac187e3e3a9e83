//! Token graduation workflow: bonding curve → pooled liquidity.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::event::StreamEvent;
use crate::domain::{ArtistToken, EventBus, LiquidityPool, TokenId};
use crate::error::GatewayError;
use crate::persistence::StreamStore;

/// Venue tag recorded on pools created by graduation.
const POOL_PLATFORM: &str = "raydium";

/// Result of a graduation evaluation.
#[derive(Debug, Clone)]
pub enum GraduationOutcome {
    /// The token had already graduated (or a concurrent caller won the
    /// claim). Nothing changed.
    AlreadyGraduated,
    /// Market cap has not reached the threshold. Nothing changed.
    BelowThreshold {
        /// Market cap observed at evaluation time.
        market_cap: Decimal,
    },
    /// The token graduated; exactly one pool record was created.
    Graduated {
        /// The newly created zero-reserve pool.
        pool: LiquidityPool,
    },
}

/// Executes the one-time transition of a token from bonding-curve trading
/// to pooled-liquidity trading.
///
/// Concurrent evaluations of the same token are serialized by the store's
/// conditional claim update: at most one caller ever proceeds past the
/// claim, so pool records cannot be double-created. Any failure after a
/// won claim runs the compensating rollback before surfacing, so the
/// token is never observably graduated without its pool.
#[derive(Debug, Clone)]
pub struct GraduationService {
    store: Arc<dyn StreamStore>,
    event_bus: EventBus,
    threshold: Decimal,
}

impl GraduationService {
    /// Creates a new `GraduationService` with the given market-cap
    /// threshold.
    #[must_use]
    pub fn new(store: Arc<dyn StreamStore>, event_bus: EventBus, threshold: Decimal) -> Self {
        Self {
            store,
            event_bus,
            threshold,
        }
    }

    /// Returns a reference to the inner store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn StreamStore> {
        &self.store
    }

    /// Returns the configured graduation threshold.
    #[must_use]
    pub const fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// Evaluates whether a token should graduate, and executes the
    /// transition when it should.
    ///
    /// Idempotent: already-graduated tokens (including ones claimed by a
    /// concurrent caller between the guard and the claim) return
    /// [`GraduationOutcome::AlreadyGraduated`] without side effects.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::TokenNotFound`] if the token is absent, or
    /// [`GatewayError::GraduationFailed`] after the compensating rollback
    /// if the commit sequence fails.
    pub async fn evaluate_graduation(
        &self,
        token_id: TokenId,
    ) -> Result<GraduationOutcome, GatewayError> {
        let token = self
            .store
            .get_token(token_id)
            .await?
            .ok_or(GatewayError::TokenNotFound(*token_id.as_uuid()))?;

        if token.graduated {
            return Ok(GraduationOutcome::AlreadyGraduated);
        }
        if token.market_cap < self.threshold {
            tracing::info!(
                %token_id,
                market_cap = %token.market_cap,
                threshold = %self.threshold,
                "token below graduation threshold"
            );
            return Ok(GraduationOutcome::BelowThreshold {
                market_cap: token.market_cap,
            });
        }

        // Serialization point: only the first caller wins the claim.
        let graduation_date = Utc::now();
        if !self.store.claim_graduation(token_id, graduation_date).await? {
            return Ok(GraduationOutcome::AlreadyGraduated);
        }

        match self.commit_pool(token_id).await {
            Ok(pool) => {
                let _ = self.event_bus.publish(StreamEvent::Graduation {
                    token_id,
                    symbol: token.symbol.clone(),
                    name: token.name.clone(),
                    graduated: true,
                    pool_address: pool.pool_address.clone(),
                    timestamp: graduation_date,
                });
                tracing::info!(
                    %token_id,
                    symbol = %token.symbol,
                    pool_address = %pool.pool_address,
                    "token graduated"
                );
                Ok(GraduationOutcome::Graduated { pool })
            }
            Err(e) => {
                // Compensating rollback: the token must never stay
                // graduated without a pool record.
                if let Err(revert_err) = self.store.revert_graduation(token_id).await {
                    tracing::error!(%token_id, error = %revert_err, "graduation rollback failed");
                }
                tracing::warn!(%token_id, error = %e, "graduation rolled back");
                Err(GatewayError::GraduationFailed {
                    token_id: *token_id.as_uuid(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn commit_pool(&self, token_id: TokenId) -> Result<LiquidityPool, GatewayError> {
        let pool = LiquidityPool::for_graduation(token_id, POOL_PLATFORM);
        self.store.insert_liquidity_pool(pool.clone()).await?;
        Ok(pool)
    }

    /// Launches a new token (ungraduated, zero market cap).
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the symbol is empty or the store
    /// fails.
    pub async fn launch_token(
        &self,
        symbol: &str,
        name: &str,
    ) -> Result<ArtistToken, GatewayError> {
        if symbol.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "token symbol must not be empty".to_string(),
            ));
        }
        let token = ArtistToken::new(TokenId::new(), symbol.trim(), name.trim());
        let created = token.clone();
        self.store.create_token(token).await?;
        tracing::info!(token_id = %created.id, symbol = %created.symbol, "token launched");
        Ok(created)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ChatMessage, LivestreamSession, SessionId, SessionStatus};
    use crate::persistence::memory::MemoryStore;
    use crate::persistence::{NewChatMessage, StreamStore};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;

    const THRESHOLD: Decimal = Decimal::from_parts(69_000, 0, 0, false, 0);

    fn make_service() -> GraduationService {
        let store: Arc<dyn StreamStore> = Arc::new(MemoryStore::new());
        GraduationService::new(store, EventBus::new(1000), THRESHOLD)
    }

    async fn launch(service: &GraduationService, market_cap: Decimal) -> TokenId {
        let Ok(token) = service.launch_token("NOVA", "Nova Sky").await else {
            panic!("launch failed");
        };
        let Ok(_) = service.store().set_market_cap(token.id, market_cap).await else {
            panic!("market cap update failed");
        };
        token.id
    }

    #[tokio::test]
    async fn unknown_token_fails() {
        let service = make_service();
        let result = service.evaluate_graduation(TokenId::new()).await;
        assert!(matches!(result, Err(GatewayError::TokenNotFound(_))));
    }

    #[tokio::test]
    async fn below_threshold_is_noop() {
        let service = make_service();
        let token_id = launch(&service, THRESHOLD - dec!(1)).await;

        let Ok(outcome) = service.evaluate_graduation(token_id).await else {
            panic!("evaluation failed");
        };
        assert!(matches!(
            outcome,
            GraduationOutcome::BelowThreshold { .. }
        ));

        let Ok(Some(token)) = service.store().get_token(token_id).await else {
            panic!("token missing");
        };
        assert!(!token.graduated);
        let Ok(pool) = service.store().pool_for_token(token_id).await else {
            panic!("pool lookup failed");
        };
        assert!(pool.is_none());
    }

    #[tokio::test]
    async fn at_threshold_graduates_with_one_pool_and_event() {
        let service = make_service();
        let token_id = launch(&service, THRESHOLD).await;
        let mut rx = service.event_bus.subscribe();

        let Ok(GraduationOutcome::Graduated { pool }) =
            service.evaluate_graduation(token_id).await
        else {
            panic!("expected graduation");
        };
        assert_eq!(pool.token_id, token_id);
        assert_eq!(pool.reserve_token, Decimal::ZERO);
        assert_eq!(pool.reserve_base, Decimal::ZERO);

        let Ok(Some(token)) = service.store().get_token(token_id).await else {
            panic!("token missing");
        };
        assert!(token.graduated);
        assert!(token.graduation_date.is_some());

        let Ok(StreamEvent::Graduation {
            graduated,
            pool_address,
            ..
        }) = rx.recv().await
        else {
            panic!("expected graduation event");
        };
        assert!(graduated);
        assert_eq!(pool_address, pool.pool_address);
        // Exactly one event was emitted.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn repeated_evaluation_is_idempotent() {
        let service = make_service();
        let token_id = launch(&service, THRESHOLD + dec!(500)).await;

        let Ok(GraduationOutcome::Graduated { .. }) =
            service.evaluate_graduation(token_id).await
        else {
            panic!("expected graduation");
        };
        let Ok(Some(first)) = service.store().get_token(token_id).await else {
            panic!("token missing");
        };

        let Ok(outcome) = service.evaluate_graduation(token_id).await else {
            panic!("second evaluation failed");
        };
        assert!(matches!(outcome, GraduationOutcome::AlreadyGraduated));

        let Ok(Some(second)) = service.store().get_token(token_id).await else {
            panic!("token missing");
        };
        assert_eq!(first.graduation_date, second.graduation_date);
    }

    #[tokio::test]
    async fn concurrent_evaluations_graduate_once() {
        let service = make_service();
        let token_id = launch(&service, THRESHOLD).await;

        let (a, b) = tokio::join!(
            service.evaluate_graduation(token_id),
            service.evaluate_graduation(token_id)
        );
        let (Ok(a), Ok(b)) = (a, b) else {
            panic!("evaluation failed");
        };
        let graduated = [&a, &b]
            .iter()
            .filter(|o| matches!(o, GraduationOutcome::Graduated { .. }))
            .count();
        assert_eq!(graduated, 1, "exactly one caller graduates the token");

        let Ok(Some(pool)) = service.store().pool_for_token(token_id).await else {
            panic!("pool missing");
        };
        assert_eq!(pool.token_id, token_id);
    }

    /// Store wrapper that fails pool creation, for exercising the
    /// compensating rollback.
    #[derive(Debug)]
    struct PoolInsertFails {
        inner: MemoryStore,
    }

    #[async_trait]
    impl StreamStore for PoolInsertFails {
        async fn create_session(&self, session: LivestreamSession) -> Result<(), GatewayError> {
            self.inner.create_session(session).await
        }
        async fn get_session(
            &self,
            id: SessionId,
        ) -> Result<Option<LivestreamSession>, GatewayError> {
            self.inner.get_session(id).await
        }
        async fn list_sessions(&self) -> Result<Vec<LivestreamSession>, GatewayError> {
            self.inner.list_sessions().await
        }
        async fn set_session_status(
            &self,
            id: SessionId,
            status: SessionStatus,
        ) -> Result<LivestreamSession, GatewayError> {
            self.inner.set_session_status(id, status).await
        }
        async fn adjust_viewer_count(
            &self,
            id: SessionId,
            delta: i32,
        ) -> Result<u32, GatewayError> {
            self.inner.adjust_viewer_count(id, delta).await
        }
        async fn insert_chat_message(
            &self,
            message: NewChatMessage,
        ) -> Result<ChatMessage, GatewayError> {
            self.inner.insert_chat_message(message).await
        }
        async fn chat_history(
            &self,
            id: SessionId,
            limit: u32,
        ) -> Result<Vec<ChatMessage>, GatewayError> {
            self.inner.chat_history(id, limit).await
        }
        async fn create_token(&self, token: ArtistToken) -> Result<(), GatewayError> {
            self.inner.create_token(token).await
        }
        async fn get_token(&self, id: TokenId) -> Result<Option<ArtistToken>, GatewayError> {
            self.inner.get_token(id).await
        }
        async fn list_tokens(&self) -> Result<Vec<ArtistToken>, GatewayError> {
            self.inner.list_tokens().await
        }
        async fn set_market_cap(
            &self,
            id: TokenId,
            market_cap: Decimal,
        ) -> Result<ArtistToken, GatewayError> {
            self.inner.set_market_cap(id, market_cap).await
        }
        async fn claim_graduation(
            &self,
            id: TokenId,
            at: DateTime<Utc>,
        ) -> Result<bool, GatewayError> {
            self.inner.claim_graduation(id, at).await
        }
        async fn revert_graduation(&self, id: TokenId) -> Result<(), GatewayError> {
            self.inner.revert_graduation(id).await
        }
        async fn insert_liquidity_pool(&self, _pool: LiquidityPool) -> Result<(), GatewayError> {
            Err(GatewayError::PersistenceError(
                "pool insert rejected".to_string(),
            ))
        }
        async fn pool_for_token(
            &self,
            token_id: TokenId,
        ) -> Result<Option<LiquidityPool>, GatewayError> {
            self.inner.pool_for_token(token_id).await
        }
    }

    #[tokio::test]
    async fn failed_commit_rolls_back_graduation() {
        let store: Arc<dyn StreamStore> = Arc::new(PoolInsertFails {
            inner: MemoryStore::new(),
        });
        let service = GraduationService::new(Arc::clone(&store), EventBus::new(1000), THRESHOLD);
        let mut rx = service.event_bus.subscribe();

        let Ok(token) = service.launch_token("NOVA", "Nova Sky").await else {
            panic!("launch failed");
        };
        let _ = store.set_market_cap(token.id, THRESHOLD).await;

        let result = service.evaluate_graduation(token.id).await;
        assert!(matches!(
            result,
            Err(GatewayError::GraduationFailed { .. })
        ));

        // Never left half-graduated.
        let Ok(Some(token)) = store.get_token(token.id).await else {
            panic!("token missing");
        };
        assert!(!token.graduated);
        assert!(token.graduation_date.is_none());

        // No graduation event escaped.
        assert!(rx.try_recv().is_err());
    }
}
