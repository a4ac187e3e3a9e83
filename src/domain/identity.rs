//! Caller identity supplied by the connection/request glue.
//!
//! The gateway does not issue or validate credentials; the identity layer
//! upstream resolves the caller and hands the result over. Anonymous
//! callers simply have no identity, which the session manager treats as a
//! silent skip for chat and tips.

use serde::{Deserialize, Serialize};

use super::UserId;

/// Resolved identity of the caller behind a connection or request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Platform user ID.
    pub user_id: UserId,
    /// Public wallet-like identifier, when the user has linked one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    /// Display name shown alongside chat messages and tips.
    pub display_name: String,
}

impl CallerIdentity {
    /// Creates an identity with the given user ID and display name.
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            wallet: None,
            display_name: display_name.into(),
        }
    }

    /// Attaches a wallet identifier.
    #[must_use]
    pub fn with_wallet(mut self, wallet: impl Into<String>) -> Self {
        self.wallet = Some(wallet.into());
        self
    }
}
