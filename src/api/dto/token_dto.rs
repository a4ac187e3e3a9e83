//! Token-related DTOs: launch, detail, market-cap updates, graduation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::{ArtistToken, LiquidityPool};
use crate::service::GraduationOutcome;

/// Request body for `POST /tokens`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LaunchTokenRequest {
    /// Ticker symbol.
    pub symbol: String,
    /// Human-readable token name.
    pub name: String,
}

/// Request body for `PUT /tokens/{id}/market-cap`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MarketCapRequest {
    /// New market cap (string-encoded decimal) derived from the bonding
    /// curve's reserves.
    pub market_cap: String,
}

/// Liquidity pool detail embedded in token responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct LiquidityPoolDto {
    /// Pool record identifier.
    pub pool_id: uuid::Uuid,
    /// Trading venue tag.
    pub platform: String,
    /// External pool address.
    pub pool_address: String,
    /// Token-side reserve (string-encoded decimal).
    pub reserve_token: String,
    /// Base-currency-side reserve (string-encoded decimal).
    pub reserve_base: String,
    /// Total value locked (string-encoded decimal).
    pub total_value_locked: String,
    /// Pool record creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<LiquidityPool> for LiquidityPoolDto {
    fn from(pool: LiquidityPool) -> Self {
        Self {
            pool_id: *pool.id.as_uuid(),
            platform: pool.platform,
            pool_address: pool.pool_address,
            reserve_token: pool.reserve_token.to_string(),
            reserve_base: pool.reserve_base.to_string(),
            total_value_locked: pool.total_value_locked.to_string(),
            created_at: pool.created_at,
        }
    }
}

/// Token detail returned by launch, get, and list endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// Token identifier.
    pub token_id: uuid::Uuid,
    /// Ticker symbol.
    pub symbol: String,
    /// Token name.
    pub name: String,
    /// Current market cap (string-encoded decimal).
    pub market_cap: String,
    /// Whether the token has graduated.
    pub graduated: bool,
    /// When graduation happened, if it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_date: Option<DateTime<Utc>>,
    /// Token launch timestamp.
    pub created_at: DateTime<Utc>,
    /// The backing pool, present once graduated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<LiquidityPoolDto>,
}

impl TokenResponse {
    /// Builds a response from a token and its optional pool.
    #[must_use]
    pub fn from_parts(token: ArtistToken, pool: Option<LiquidityPool>) -> Self {
        Self {
            token_id: *token.id.as_uuid(),
            symbol: token.symbol,
            name: token.name,
            market_cap: token.market_cap.to_string(),
            graduated: token.graduated,
            graduation_date: token.graduation_date,
            created_at: token.created_at,
            pool: pool.map(LiquidityPoolDto::from),
        }
    }
}

/// Paginated list response for `GET /tokens`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenListResponse {
    /// Token details for the requested page.
    pub data: Vec<TokenResponse>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Response body for `POST /tokens/{id}/evaluate`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EvaluateGraduationResponse {
    /// Evaluation outcome: `graduated`, `already_graduated`, or
    /// `below_threshold`.
    pub outcome: String,
    /// Market cap observed at evaluation time (below-threshold only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<String>,
    /// The newly created pool (graduated only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<LiquidityPoolDto>,
}

impl From<GraduationOutcome> for EvaluateGraduationResponse {
    fn from(outcome: GraduationOutcome) -> Self {
        match outcome {
            GraduationOutcome::AlreadyGraduated => Self {
                outcome: "already_graduated".to_string(),
                market_cap: None,
                pool: None,
            },
            GraduationOutcome::BelowThreshold { market_cap } => Self {
                outcome: "below_threshold".to_string(),
                market_cap: Some(market_cap.to_string()),
                pool: None,
            },
            GraduationOutcome::Graduated { pool } => Self {
                outcome: "graduated".to_string(),
                market_cap: None,
                pool: Some(LiquidityPoolDto::from(pool)),
            },
        }
    }
}
