//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::{CallerIdentity, UserId};

/// Identity query parameters on the upgrade request.
///
/// The auth glue upstream terminates credentials and forwards the
/// resolved identity; an absent `user_id` means the caller is anonymous.
#[derive(Debug, Deserialize)]
pub struct IdentityQuery {
    /// Resolved platform user ID.
    pub user_id: Option<uuid::Uuid>,
    /// Linked wallet identifier.
    pub wallet: Option<String>,
    /// Display name for chat and tips.
    pub display_name: Option<String>,
}

impl IdentityQuery {
    fn into_identity(self) -> Option<CallerIdentity> {
        let user_id = self.user_id?;
        let mut identity = CallerIdentity::new(
            UserId::from_uuid(user_id),
            self.display_name.unwrap_or_else(|| "viewer".to_string()),
        );
        if let Some(wallet) = self.wallet {
            identity = identity.with_wallet(wallet);
        }
        Some(identity)
    }
}

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<IdentityQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let event_rx = state.event_bus.subscribe();
    let session_service = std::sync::Arc::clone(&state.session_service);
    let identity = query.into_identity();

    ws.on_upgrade(move |socket| run_connection(socket, event_rx, session_service, identity))
}
