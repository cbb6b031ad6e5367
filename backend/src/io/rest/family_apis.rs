//! # REST API for Family Views
//!
//! A parent's child list, balances and coin ledgers, plus the child's own
//! profile.

use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use tracing::info;

use crate::io::rest::error::ApiError;
use crate::io::rest::extract::{ApiPath, Authenticated, ChildUser, ParentUser};
use crate::io::rest::mappers::AccountMapper;
use crate::AppState;
use shared::{CoinsResponse, LedgerResponse};

/// Routes mounted under `/api/parent`
pub fn parent_router() -> Router<AppState> {
    Router::new()
        .route("/children", get(list_children))
        .route("/child/:child_id/coins", get(get_child_coins))
        .route("/child/:child_id/ledger", get(get_child_ledger))
}

/// Routes mounted under `/api/child`
pub fn child_router() -> Router<AppState> {
    Router::new().route("/me", get(get_current_child))
}

pub async fn list_children(
    State(state): State<AppState>,
    ParentUser(parent): ParentUser,
) -> impl IntoResponse {
    info!("GET /api/parent/children - {}", parent.id);

    match state.family_service.list_children(&parent).await {
        Ok(children) => Json(AccountMapper::to_child_list_dto(children)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_child_coins(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    ApiPath(child_id): ApiPath<String>,
) -> impl IntoResponse {
    info!("GET /api/parent/child/{}/coins", child_id);

    match state.family_service.coins(&user, &child_id).await {
        Ok(coins) => Json(CoinsResponse { child_id, coins }).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_child_ledger(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    ApiPath(child_id): ApiPath<String>,
) -> impl IntoResponse {
    info!("GET /api/parent/child/{}/ledger", child_id);

    match state.family_service.ledger(&user, &child_id).await {
        Ok(entries) => Json(LedgerResponse { child_id, entries }).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// The calling child with an up-to-date balance
pub async fn get_current_child(
    State(state): State<AppState>,
    ChildUser(child): ChildUser,
) -> impl IntoResponse {
    info!("GET /api/child/me - {}", child.id);

    match state.family_service.me(&child).await {
        Ok(child) => Json(AccountMapper::to_child_dto(child)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
