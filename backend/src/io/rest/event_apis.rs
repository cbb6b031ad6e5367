//! # REST API for Events and Notifications
//!
//! `GET /api/events` pages through the caller's event log by sequence
//! number. Notifications are the role-relevant events newer than the
//! caller's server-side cleared-through cursor.

use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;

use crate::domain::commands::events::EventListQuery;
use crate::io::rest::error::ApiError;
use crate::io::rest::extract::{ApiQuery, Authenticated};
use crate::AppState;
use shared::{ClearNotificationsResponse, EventListResponse, NotificationsResponse};

#[derive(Debug, Default, Deserialize)]
pub struct EventQueryParams {
    pub after: Option<i64>,
    pub limit: Option<u32>,
}

/// Routes mounted directly under `/api`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/notifications", get(get_notifications))
        .route("/notifications/clear", post(clear_notifications))
}

pub async fn list_events(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    ApiQuery(params): ApiQuery<EventQueryParams>,
) -> impl IntoResponse {
    info!("GET /api/events - {:?}", params);

    let query = EventListQuery {
        after: params.after,
        limit: params.limit,
    };

    match state.event_service.list_events(&user, query).await {
        Ok(result) => Json(EventListResponse {
            events: result.events,
            latest_seq: result.latest_seq,
        })
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_notifications(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
) -> impl IntoResponse {
    info!("GET /api/notifications - {}", user.id());

    match state.event_service.notifications(&user).await {
        Ok(result) => Json(NotificationsResponse {
            notifications: result.notifications,
            cleared_through: result.cleared_through,
            cleared_at: result.cleared_at,
        })
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn clear_notifications(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
) -> impl IntoResponse {
    info!("POST /api/notifications/clear - {}", user.id());

    match state.event_service.clear_notifications(&user).await {
        Ok(result) => Json(ClearNotificationsResponse {
            cleared_through: result.cleared_through,
            cleared_at: result.cleared_at.to_rfc3339(),
        })
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
