//! # REST API Interface Layer
//!
//! HTTP endpoints for the chore tracker, all nested under `/api`.
//!
//! - Handlers log the request line, call one domain service and map the
//!   result to a DTO from `shared`
//! - Failures go through [`error::ApiError`] so every error body has the
//!   same `{"error", "code"}` shape
//! - Authentication is an extractor: handlers that take [`extract::Authenticated`],
//!   [`extract::ParentUser`] or [`extract::ChildUser`] reject requests
//!   without a valid bearer token

pub mod animal_apis;
pub mod auth_apis;
pub mod error;
pub mod event_apis;
pub mod extract;
pub mod family_apis;
pub mod mappers;
pub mod task_apis;

use axum::{response::Json, routing::get, Router};
use shared::HealthResponse;

use crate::AppState;

/// Every `/api` route, without middleware
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_apis::router())
        .nest("/task", task_apis::router())
        .nest("/parent", family_apis::parent_router())
        .nest("/child", family_apis::child_router())
        .nest("/animals", animal_apis::router())
        .merge(event_apis::router())
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
