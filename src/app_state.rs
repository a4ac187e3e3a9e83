//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::{GraduationService, SessionService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session manager for viewer membership, chat, and tips.
    pub session_service: Arc<SessionService>,
    /// Token graduation workflow.
    pub graduation_service: Arc<GraduationService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Maximum number of messages returned by the chat history endpoint.
    pub chat_history_limit: u32,
}
