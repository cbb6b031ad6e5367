//! # REST API for Accounts
//!
//! Registration, login and the current-account lookup.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tracing::info;

use crate::domain::commands::auth::{LoginCommand, RegisterChildCommand, RegisterParentCommand};
use crate::io::rest::error::ApiError;
use crate::io::rest::extract::{ApiJson, Authenticated};
use crate::io::rest::mappers::AccountMapper;
use crate::AppState;
use shared::{LoginRequest, RegisterChildRequest, RegisterParentRequest};

/// Create a router for account related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register/parent", post(register_parent))
        .route("/register/child", post(register_child))
        .route("/login", post(login))
        .route("/me", get(me))
}

/// Register a parent and return its token
pub async fn register_parent(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterParentRequest>,
) -> impl IntoResponse {
    info!("POST /api/auth/register/parent - email: {}", request.email);

    let command = RegisterParentCommand {
        name: request.name,
        email: request.email,
        password: request.password,
    };

    match state.auth_service.register_parent(command).await {
        Ok(result) => {
            (StatusCode::CREATED, Json(AccountMapper::to_auth_response(result))).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Register a child under an existing parent
pub async fn register_child(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterChildRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/auth/register/child - email: {}, parent: {}",
        request.email, request.parent_id
    );

    let command = RegisterChildCommand {
        name: request.name,
        email: request.email,
        password: request.password,
        parent_id: request.parent_id,
    };

    match state.auth_service.register_child(command).await {
        Ok(result) => {
            (StatusCode::CREATED, Json(AccountMapper::to_auth_response(result))).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> impl IntoResponse {
    info!("POST /api/auth/login - email: {}", request.email);

    let command = LoginCommand {
        email: request.email,
        password: request.password,
    };

    match state.auth_service.login(command).await {
        Ok(result) => {
            (StatusCode::OK, Json(AccountMapper::to_auth_response(result))).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// The account behind the bearer token
pub async fn me(Authenticated(user): Authenticated) -> impl IntoResponse {
    info!("GET /api/auth/me - {}", user.id());
    Json(AccountMapper::to_account_dto(&user))
}
