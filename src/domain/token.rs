//! Artist tokens and the liquidity pools they graduate into.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{PoolId, TokenId};

/// A bonding-curve artist token.
///
/// `market_cap` is derived from the curve's reserves by an external
/// indexer and pushed to the gateway; the curve math itself lives outside
/// this service. `graduated` flips exactly once — the compensating
/// rollback in the graduation workflow is the only path back to `false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistToken {
    /// Token identifier.
    pub id: TokenId,
    /// Ticker symbol (e.g. `"NOVA"`).
    pub symbol: String,
    /// Human-readable token name.
    pub name: String,
    /// Current market capitalization in base-currency units.
    pub market_cap: Decimal,
    /// Whether the token has graduated to pooled-liquidity trading.
    pub graduated: bool,
    /// When graduation happened. Set iff `graduated` is `true`.
    pub graduation_date: Option<DateTime<Utc>>,
    /// Token launch timestamp.
    pub created_at: DateTime<Utc>,
}

impl ArtistToken {
    /// Creates a freshly launched, ungraduated token.
    #[must_use]
    pub fn new(id: TokenId, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            name: name.into(),
            market_cap: Decimal::ZERO,
            graduated: false,
            graduation_date: None,
            created_at: Utc::now(),
        }
    }
}

/// A liquidity pool record created by a successful graduation.
///
/// Created with zero reserves and a placeholder external address; the
/// real on-chain pool is provisioned by a downstream system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityPool {
    /// Pool record identifier.
    pub id: PoolId,
    /// Token this pool backs.
    pub token_id: TokenId,
    /// Trading venue tag (e.g. `"raydium"`).
    pub platform: String,
    /// External pool address.
    pub pool_address: String,
    /// Token-side reserve.
    pub reserve_token: Decimal,
    /// Base-currency-side reserve.
    pub reserve_base: Decimal,
    /// Total value locked.
    pub total_value_locked: Decimal,
    /// Pool record creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl LiquidityPool {
    /// Creates the initial zero-reserve pool record for a graduation.
    #[must_use]
    pub fn for_graduation(token_id: TokenId, platform: impl Into<String>) -> Self {
        let id = PoolId::new();
        Self {
            id,
            token_id,
            platform: platform.into(),
            pool_address: format!("LP-{}", id.as_uuid()),
            reserve_token: Decimal::ZERO,
            reserve_base: Decimal::ZERO,
            total_value_locked: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_token_is_ungraduated() {
        let token = ArtistToken::new(TokenId::new(), "NOVA", "Nova Sky");
        assert!(!token.graduated);
        assert!(token.graduation_date.is_none());
        assert_eq!(token.market_cap, Decimal::ZERO);
    }

    #[test]
    fn graduation_pool_starts_empty() {
        let token_id = TokenId::new();
        let pool = LiquidityPool::for_graduation(token_id, "raydium");
        assert_eq!(pool.token_id, token_id);
        assert_eq!(pool.reserve_token, Decimal::ZERO);
        assert_eq!(pool.reserve_base, Decimal::ZERO);
        assert!(pool.pool_address.starts_with("LP-"));
    }
}
