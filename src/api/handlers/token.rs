//! Token endpoints: launch, market-cap updates, graduation evaluation.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;

use crate::api::dto::{
    EvaluateGraduationResponse, LaunchTokenRequest, MarketCapRequest, PaginationParams,
    TokenListResponse, TokenResponse,
};
use crate::app_state::AppState;
use crate::domain::TokenId;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /tokens` — Launch a new artist token.
///
/// # Errors
///
/// Returns [`GatewayError`] on an empty symbol.
#[utoipa::path(
    post,
    path = "/api/v1/tokens",
    tag = "Tokens",
    summary = "Launch an artist token",
    description = "Creates an ungraduated token with zero market cap. Bonding-curve trading happens off-gateway; an indexer pushes market-cap updates back.",
    request_body = LaunchTokenRequest,
    responses(
        (status = 201, description = "Token launched", body = TokenResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn launch_token(
    State(state): State<AppState>,
    Json(req): Json<LaunchTokenRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let token = state
        .graduation_service
        .launch_token(&req.symbol, &req.name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse::from_parts(token, None)),
    ))
}

/// `GET /tokens` — List tokens with pagination.
///
/// # Errors
///
/// Returns [`GatewayError`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/tokens",
    tag = "Tokens",
    summary = "List tokens",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated token list", body = TokenListResponse),
    )
)]
pub async fn list_tokens(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let params = params.clamped();
    let tokens = state.graduation_service.store().list_tokens().await?;

    let total = u32::try_from(tokens.len()).unwrap_or(u32::MAX);
    let start = ((params.page - 1) * params.per_page) as usize;
    let data: Vec<TokenResponse> = tokens
        .into_iter()
        .skip(start)
        .take(params.per_page as usize)
        .map(|t| TokenResponse::from_parts(t, None))
        .collect();

    Ok(Json(TokenListResponse {
        data,
        pagination: params.meta(total),
    }))
}

/// `GET /tokens/:id` — Get token details, including the pool once
/// graduated.
///
/// # Errors
///
/// Returns [`GatewayError::TokenNotFound`] if the token does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/tokens/{id}",
    tag = "Tokens",
    summary = "Get token details",
    params(("id" = uuid::Uuid, Path, description = "Token UUID")),
    responses(
        (status = 200, description = "Token details", body = TokenResponse),
        (status = 404, description = "Token not found", body = ErrorResponse),
    )
)]
pub async fn get_token(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let token_id = TokenId::from_uuid(id);
    let store = state.graduation_service.store();
    let token = store
        .get_token(token_id)
        .await?
        .ok_or(GatewayError::TokenNotFound(id))?;
    let pool = if token.graduated {
        store.pool_for_token(token_id).await?
    } else {
        None
    };
    Ok(Json(TokenResponse::from_parts(token, pool)))
}

/// `PUT /tokens/:id/market-cap` — Indexer callback updating the
/// curve-derived market cap.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on an unparsable amount or
/// [`GatewayError::TokenNotFound`] if the token does not exist.
#[utoipa::path(
    put,
    path = "/api/v1/tokens/{id}/market-cap",
    tag = "Tokens",
    summary = "Update market cap",
    params(("id" = uuid::Uuid, Path, description = "Token UUID")),
    request_body = MarketCapRequest,
    responses(
        (status = 200, description = "Market cap updated", body = TokenResponse),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 404, description = "Token not found", body = ErrorResponse),
    )
)]
pub async fn set_market_cap(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<MarketCapRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let market_cap = Decimal::from_str(&req.market_cap).map_err(|_| {
        GatewayError::InvalidRequest(format!("invalid market_cap: {}", req.market_cap))
    })?;
    if market_cap < Decimal::ZERO {
        return Err(GatewayError::InvalidRequest(
            "market_cap must not be negative".to_string(),
        ));
    }
    let token = state
        .graduation_service
        .store()
        .set_market_cap(TokenId::from_uuid(id), market_cap)
        .await?;
    Ok(Json(TokenResponse::from_parts(token, None)))
}

/// `POST /tokens/:id/evaluate` — Evaluate graduation readiness and
/// execute the transition when the threshold is met.
///
/// Invoked by the platform's scheduler after market-cap updates.
/// Idempotent: re-evaluating a graduated token is a no-op.
///
/// # Errors
///
/// Returns [`GatewayError::TokenNotFound`] if the token does not exist,
/// or [`GatewayError::GraduationFailed`] if the commit sequence failed
/// and was rolled back.
#[utoipa::path(
    post,
    path = "/api/v1/tokens/{id}/evaluate",
    tag = "Tokens",
    summary = "Evaluate graduation",
    params(("id" = uuid::Uuid, Path, description = "Token UUID")),
    responses(
        (status = 200, description = "Evaluation outcome", body = EvaluateGraduationResponse),
        (status = 404, description = "Token not found", body = ErrorResponse),
        (status = 500, description = "Graduation failed and was rolled back", body = ErrorResponse),
    )
)]
pub async fn evaluate_graduation(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let outcome = state
        .graduation_service
        .evaluate_graduation(TokenId::from_uuid(id))
        .await?;
    Ok(Json(EvaluateGraduationResponse::from(outcome)))
}

/// Token management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tokens", post(launch_token).get(list_tokens))
        .route("/tokens/{id}", get(get_token))
        .route("/tokens/{id}/market-cap", put(set_market_cap))
        .route("/tokens/{id}/evaluate", post(evaluate_graduation))
}
