//! PostgreSQL implementation of [`StreamStore`].
//!
//! Tables: `livestream_sessions`, `chat_messages`, `artist_tokens`,
//! `liquidity_pools` (one row per token, enforced by a unique index).
//! Viewer-count deltas and the graduation claim are single conditional
//! statements so concurrent callers cannot lose updates or double-claim.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::{NewChatMessage, StreamStore};
use crate::config::GatewayConfig;
use crate::domain::chat::TipDetails;
use crate::domain::{
    ArtistToken, CallerIdentity, ChatMessage, LiquidityPool, LivestreamSession, PoolId, SessionId,
    SessionStatus, TokenId, UserId,
};
use crate::error::GatewayError;

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

type SessionRow = (
    Uuid,
    Uuid,
    String,
    String,
    i32,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

type ChatRow = (
    i64,
    Uuid,
    Uuid,
    Option<String>,
    String,
    String,
    Option<Decimal>,
    Option<String>,
    DateTime<Utc>,
);

type TokenRow = (
    Uuid,
    String,
    String,
    Decimal,
    bool,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
);

type PoolRow = (
    Uuid,
    Uuid,
    String,
    String,
    Decimal,
    Decimal,
    Decimal,
    DateTime<Utc>,
);

impl PostgresStore {
    /// Creates a store with an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to PostgreSQL using the gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if the connection
    /// cannot be established.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Creates the gateway tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn init_schema(&self) -> Result<(), GatewayError> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS livestream_sessions (\
                 id UUID PRIMARY KEY, \
                 artist_id UUID NOT NULL, \
                 title TEXT NOT NULL, \
                 status TEXT NOT NULL, \
                 viewer_count INT NOT NULL DEFAULT 0, \
                 created_at TIMESTAMPTZ NOT NULL, \
                 started_at TIMESTAMPTZ, \
                 ended_at TIMESTAMPTZ)",
            "CREATE TABLE IF NOT EXISTS chat_messages (\
                 id BIGSERIAL PRIMARY KEY, \
                 session_id UUID NOT NULL, \
                 author_user_id UUID NOT NULL, \
                 author_wallet TEXT, \
                 author_display_name TEXT NOT NULL, \
                 content TEXT NOT NULL, \
                 tip_amount NUMERIC, \
                 tip_currency TEXT, \
                 sent_at TIMESTAMPTZ NOT NULL)",
            "CREATE INDEX IF NOT EXISTS chat_messages_session_order \
                 ON chat_messages (session_id, sent_at, id)",
            "CREATE TABLE IF NOT EXISTS artist_tokens (\
                 id UUID PRIMARY KEY, \
                 symbol TEXT NOT NULL, \
                 name TEXT NOT NULL, \
                 market_cap NUMERIC NOT NULL DEFAULT 0, \
                 graduated BOOLEAN NOT NULL DEFAULT FALSE, \
                 graduation_date TIMESTAMPTZ, \
                 created_at TIMESTAMPTZ NOT NULL)",
            "CREATE TABLE IF NOT EXISTS liquidity_pools (\
                 id UUID PRIMARY KEY, \
                 token_id UUID NOT NULL UNIQUE, \
                 platform TEXT NOT NULL, \
                 pool_address TEXT NOT NULL, \
                 reserve_token NUMERIC NOT NULL, \
                 reserve_base NUMERIC NOT NULL, \
                 total_value_locked NUMERIC NOT NULL, \
                 created_at TIMESTAMPTZ NOT NULL)",
        ];
        for sql in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;
        }
        Ok(())
    }
}

fn parse_status(s: &str) -> Result<SessionStatus, GatewayError> {
    match s {
        "scheduled" => Ok(SessionStatus::Scheduled),
        "live" => Ok(SessionStatus::Live),
        "ended" => Ok(SessionStatus::Ended),
        other => Err(GatewayError::PersistenceError(format!(
            "unknown session status: {other}"
        ))),
    }
}

fn session_from_row(row: SessionRow) -> Result<LivestreamSession, GatewayError> {
    let (id, artist_id, title, status, viewer_count, created_at, started_at, ended_at) = row;
    Ok(LivestreamSession {
        id: SessionId::from_uuid(id),
        artist_id: UserId::from_uuid(artist_id),
        title,
        status: parse_status(&status)?,
        viewer_count: u32::try_from(viewer_count).unwrap_or(0),
        created_at,
        started_at,
        ended_at,
    })
}

fn chat_from_row(row: ChatRow) -> ChatMessage {
    let (id, session_id, user_id, wallet, display_name, content, tip_amount, tip_currency, sent_at) =
        row;
    let tip = match (tip_amount, tip_currency) {
        (Some(amount), Some(currency)) => Some(TipDetails { amount, currency }),
        _ => None,
    };
    ChatMessage {
        id,
        session_id: SessionId::from_uuid(session_id),
        author: CallerIdentity {
            user_id: UserId::from_uuid(user_id),
            wallet,
            display_name,
        },
        content,
        tip,
        sent_at,
    }
}

fn token_from_row(row: TokenRow) -> ArtistToken {
    let (id, symbol, name, market_cap, graduated, graduation_date, created_at) = row;
    ArtistToken {
        id: TokenId::from_uuid(id),
        symbol,
        name,
        market_cap,
        graduated,
        graduation_date,
        created_at,
    }
}

fn pool_from_row(row: PoolRow) -> LiquidityPool {
    let (id, token_id, platform, pool_address, reserve_token, reserve_base, tvl, created_at) = row;
    LiquidityPool {
        id: PoolId::from_uuid(id),
        token_id: TokenId::from_uuid(token_id),
        platform,
        pool_address,
        reserve_token,
        reserve_base,
        total_value_locked: tvl,
        created_at,
    }
}

fn persistence_err(e: sqlx::Error) -> GatewayError {
    GatewayError::PersistenceError(e.to_string())
}

const SESSION_COLUMNS: &str =
    "id, artist_id, title, status, viewer_count, created_at, started_at, ended_at";
const TOKEN_COLUMNS: &str =
    "id, symbol, name, market_cap, graduated, graduation_date, created_at";

#[async_trait]
impl StreamStore for PostgresStore {
    async fn create_session(&self, session: LivestreamSession) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO livestream_sessions \
             (id, artist_id, title, status, viewer_count, created_at, started_at, ended_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(session.id.as_uuid())
        .bind(session.artist_id.as_uuid())
        .bind(&session.title)
        .bind(session.status.as_str())
        .bind(i32::try_from(session.viewer_count).unwrap_or(i32::MAX))
        .bind(session.created_at)
        .bind(session.started_at)
        .bind(session.ended_at)
        .execute(&self.pool)
        .await
        .map_err(persistence_err)?;
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<LivestreamSession>, GatewayError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM livestream_sessions WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_err)?;
        row.map(session_from_row).transpose()
    }

    async fn list_sessions(&self) -> Result<Vec<LivestreamSession>, GatewayError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM livestream_sessions ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_err)?;
        rows.into_iter().map(session_from_row).collect()
    }

    async fn set_session_status(
        &self,
        id: SessionId,
        status: SessionStatus,
    ) -> Result<LivestreamSession, GatewayError> {
        let current = self
            .get_session(id)
            .await?
            .ok_or(GatewayError::SessionNotFound(*id.as_uuid()))?;
        if !current.can_transition_to(status) {
            return Err(GatewayError::InvalidTransition(format!(
                "{} -> {}",
                current.status.as_str(),
                status.as_str()
            )));
        }

        // Conditional on the observed status so a concurrent transition
        // cannot be overwritten.
        let sql = match status {
            SessionStatus::Live => {
                "UPDATE livestream_sessions SET status = 'live', started_at = $3 \
                 WHERE id = $1 AND status = $2"
            }
            SessionStatus::Ended => {
                "UPDATE livestream_sessions SET status = 'ended', ended_at = $3, viewer_count = 0 \
                 WHERE id = $1 AND status = $2"
            }
            SessionStatus::Scheduled => {
                return Err(GatewayError::InvalidTransition(
                    "cannot return to scheduled".to_string(),
                ));
            }
        };
        let result = sqlx::query(sql)
            .bind(id.as_uuid())
            .bind(current.status.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(persistence_err)?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::InvalidTransition(
                "status changed concurrently".to_string(),
            ));
        }

        self.get_session(id)
            .await?
            .ok_or(GatewayError::SessionNotFound(*id.as_uuid()))
    }

    async fn adjust_viewer_count(&self, id: SessionId, delta: i32) -> Result<u32, GatewayError> {
        let row = sqlx::query_scalar::<_, i32>(
            "UPDATE livestream_sessions \
             SET viewer_count = GREATEST(viewer_count + $2, 0) \
             WHERE id = $1 AND status = 'live' \
             RETURNING viewer_count",
        )
        .bind(id.as_uuid())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_err)?;

        match row {
            Some(count) => Ok(u32::try_from(count).unwrap_or(0)),
            None => match self.get_session(id).await? {
                Some(_) => Err(GatewayError::SessionNotLive(*id.as_uuid())),
                None => Err(GatewayError::SessionNotFound(*id.as_uuid())),
            },
        }
    }

    async fn insert_chat_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessage, GatewayError> {
        let (tip_amount, tip_currency) = match &message.tip {
            Some(tip) => (Some(tip.amount), Some(tip.currency.clone())),
            None => (None, None),
        };
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO chat_messages \
             (session_id, author_user_id, author_wallet, author_display_name, \
              content, tip_amount, tip_currency, sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(message.session_id.as_uuid())
        .bind(message.author.user_id.as_uuid())
        .bind(&message.author.wallet)
        .bind(&message.author.display_name)
        .bind(&message.content)
        .bind(tip_amount)
        .bind(&tip_currency)
        .bind(message.sent_at)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence_err)?;

        Ok(ChatMessage {
            id,
            session_id: message.session_id,
            author: message.author,
            content: message.content,
            tip: message.tip,
            sent_at: message.sent_at,
        })
    }

    async fn chat_history(
        &self,
        id: SessionId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, GatewayError> {
        let rows = sqlx::query_as::<_, ChatRow>(
            "SELECT id, session_id, author_user_id, author_wallet, author_display_name, \
                    content, tip_amount, tip_currency, sent_at \
             FROM chat_messages WHERE session_id = $1 \
             ORDER BY sent_at DESC, id DESC LIMIT $2",
        )
        .bind(id.as_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_err)?;

        let mut history: Vec<ChatMessage> = rows.into_iter().map(chat_from_row).collect();
        history.reverse();
        Ok(history)
    }

    async fn create_token(&self, token: ArtistToken) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO artist_tokens \
             (id, symbol, name, market_cap, graduated, graduation_date, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(token.id.as_uuid())
        .bind(&token.symbol)
        .bind(&token.name)
        .bind(token.market_cap)
        .bind(token.graduated)
        .bind(token.graduation_date)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(persistence_err)?;
        Ok(())
    }

    async fn get_token(&self, id: TokenId) -> Result<Option<ArtistToken>, GatewayError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM artist_tokens WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_err)?;
        Ok(row.map(token_from_row))
    }

    async fn list_tokens(&self) -> Result<Vec<ArtistToken>, GatewayError> {
        let rows = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM artist_tokens ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_err)?;
        Ok(rows.into_iter().map(token_from_row).collect())
    }

    async fn set_market_cap(
        &self,
        id: TokenId,
        market_cap: Decimal,
    ) -> Result<ArtistToken, GatewayError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "UPDATE artist_tokens SET market_cap = $2 WHERE id = $1 RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(market_cap)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_err)?;
        row.map(token_from_row)
            .ok_or(GatewayError::TokenNotFound(*id.as_uuid()))
    }

    async fn claim_graduation(&self, id: TokenId, at: DateTime<Utc>) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE artist_tokens SET graduated = TRUE, graduation_date = $2 \
             WHERE id = $1 AND graduated = FALSE",
        )
        .bind(id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(persistence_err)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        match self.get_token(id).await? {
            Some(_) => Ok(false),
            None => Err(GatewayError::TokenNotFound(*id.as_uuid())),
        }
    }

    async fn revert_graduation(&self, id: TokenId) -> Result<(), GatewayError> {
        sqlx::query(
            "UPDATE artist_tokens SET graduated = FALSE, graduation_date = NULL WHERE id = $1",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(persistence_err)?;
        Ok(())
    }

    async fn insert_liquidity_pool(&self, pool: LiquidityPool) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO liquidity_pools \
             (id, token_id, platform, pool_address, reserve_token, reserve_base, \
              total_value_locked, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(pool.id.as_uuid())
        .bind(pool.token_id.as_uuid())
        .bind(&pool.platform)
        .bind(&pool.pool_address)
        .bind(pool.reserve_token)
        .bind(pool.reserve_base)
        .bind(pool.total_value_locked)
        .bind(pool.created_at)
        .execute(&self.pool)
        .await
        .map_err(persistence_err)?;
        Ok(())
    }

    async fn pool_for_token(
        &self,
        token_id: TokenId,
    ) -> Result<Option<LiquidityPool>, GatewayError> {
        let row = sqlx::query_as::<_, PoolRow>(
            "SELECT id, token_id, platform, pool_address, reserve_token, reserve_base, \
                    total_value_locked, created_at \
             FROM liquidity_pools WHERE token_id = $1",
        )
        .bind(token_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence_err)?;
        Ok(row.map(pool_from_row))
    }
}
