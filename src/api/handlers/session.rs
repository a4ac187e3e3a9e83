//! Session endpoints: create, lifecycle transitions, list, chat history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ChatHistoryResponse, ChatMessageDto, CreateSessionRequest, PaginationParams,
    SessionListResponse, SessionResponse,
};
use crate::app_state::AppState;
use crate::domain::{SessionId, UserId};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /sessions` — Create a scheduled livestream session.
///
/// # Errors
///
/// Returns [`GatewayError`] on an empty title or duplicate session ID.
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "Sessions",
    summary = "Create a livestream session",
    description = "Creates a session in the scheduled state. The session ID may be supplied to match the platform's content record, or omitted to generate one.",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let session = state
        .session_service
        .create_session(
            req.session_id.map(SessionId::from_uuid),
            UserId::from_uuid(req.artist_id),
            &req.title,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

/// `POST /sessions/:id/start` — Transition a scheduled session to live.
///
/// # Errors
///
/// Returns [`GatewayError::SessionNotFound`] or
/// [`GatewayError::InvalidTransition`].
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/start",
    tag = "Sessions",
    summary = "Start a session",
    params(("id" = uuid::Uuid, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Session is live", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Not startable from current status", body = ErrorResponse),
    )
)]
pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let session = state
        .session_service
        .start_session(SessionId::from_uuid(id))
        .await?;
    Ok(Json(SessionResponse::from(session)))
}

/// `POST /sessions/:id/stop` — End a live session.
///
/// # Errors
///
/// Returns [`GatewayError::SessionNotFound`] or
/// [`GatewayError::InvalidTransition`].
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/stop",
    tag = "Sessions",
    summary = "Stop a session",
    description = "Ends a live session and resets its viewer count to zero.",
    params(("id" = uuid::Uuid, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Session ended", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Not stoppable from current status", body = ErrorResponse),
    )
)]
pub async fn stop_session(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let session = state
        .session_service
        .stop_session(SessionId::from_uuid(id))
        .await?;
    Ok(Json(SessionResponse::from(session)))
}

/// `GET /sessions` — List sessions with pagination.
///
/// # Errors
///
/// Returns [`GatewayError`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/sessions",
    tag = "Sessions",
    summary = "List sessions",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated session list", body = SessionListResponse),
    )
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let params = params.clamped();
    let sessions = state.session_service.store().list_sessions().await?;

    let total = u32::try_from(sessions.len()).unwrap_or(u32::MAX);
    let start = ((params.page - 1) * params.per_page) as usize;
    let data: Vec<SessionResponse> = sessions
        .into_iter()
        .skip(start)
        .take(params.per_page as usize)
        .map(SessionResponse::from)
        .collect();

    Ok(Json(SessionListResponse {
        data,
        pagination: params.meta(total),
    }))
}

/// `GET /sessions/:id` — Get session details.
///
/// # Errors
///
/// Returns [`GatewayError::SessionNotFound`] if the session does not
/// exist.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    tag = "Sessions",
    summary = "Get session details",
    params(("id" = uuid::Uuid, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Session details", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let session = state
        .session_service
        .store()
        .get_session(SessionId::from_uuid(id))
        .await?
        .ok_or(GatewayError::SessionNotFound(id))?;
    Ok(Json(SessionResponse::from(session)))
}

/// `GET /sessions/:id/messages` — Chat history for a session.
///
/// # Errors
///
/// Returns [`GatewayError::SessionNotFound`] if the session does not
/// exist.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/messages",
    tag = "Sessions",
    summary = "Get chat history",
    description = "Returns the most recent messages in ascending (sent_at, id) order, bounded by the configured history limit.",
    params(("id" = uuid::Uuid, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Chat history", body = ChatHistoryResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn chat_history(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let session_id = SessionId::from_uuid(id);
    let store = state.session_service.store();
    if store.get_session(session_id).await?.is_none() {
        return Err(GatewayError::SessionNotFound(id));
    }
    let messages = store
        .chat_history(session_id, state.chat_history_limit)
        .await?;
    Ok(Json(ChatHistoryResponse {
        data: messages.into_iter().map(ChatMessageDto::from).collect(),
    }))
}

/// Session management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/start", post(start_session))
        .route("/sessions/{id}/stop", post(stop_session))
        .route("/sessions/{id}/messages", get(chat_history))
}
