//! # REST API for Tasks
//!
//! Task CRUD for parents and the lifecycle actions:
//! complete and undo for the child, approve, reject and unapprove for the
//! parent. Lifecycle responses carry `changed: false` when the task was
//! already in the requested state.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
    Router,
};
use tracing::info;

use crate::domain::commands::tasks::{CreateTaskCommand, UpdateTaskCommand};
use crate::domain::models::task::TaskAction;
use crate::io::rest::error::ApiError;
use crate::io::rest::extract::{ApiJson, ApiPath, Authenticated, ParentUser};
use crate::io::rest::mappers::TaskMapper;
use crate::AppState;
use shared::{CreateTaskRequest, UpdateTaskRequest};

/// Create a router for task related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_task))
        .route("/parent", get(list_parent_tasks))
        .route("/child/:child_id", get(list_child_tasks))
        .route("/:task_id", get(get_task).patch(update_task).delete(delete_task))
        .route("/:task_id/complete", patch(complete_task))
        .route("/:task_id/undo", patch(undo_task))
        .route("/:task_id/approve", patch(approve_task))
        .route("/:task_id/reject", patch(reject_task))
        .route("/:task_id/unapprove", patch(unapprove_task))
}

pub async fn create_task(
    State(state): State<AppState>,
    ParentUser(parent): ParentUser,
    ApiJson(request): ApiJson<CreateTaskRequest>,
) -> impl IntoResponse {
    info!("POST /api/task - request: {:?}", request);

    let command = CreateTaskCommand {
        child_id: request.child_id,
        title: request.title,
        description: request.description,
        reward: request.reward,
    };

    match state.task_service.create_task(&parent, command).await {
        Ok(task) => {
            let message = format!("Task '{}' created", task.title);
            (StatusCode::CREATED, Json(TaskMapper::to_task_response(task, message))).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// All tasks across the parent's children
pub async fn list_parent_tasks(
    State(state): State<AppState>,
    ParentUser(parent): ParentUser,
) -> impl IntoResponse {
    info!("GET /api/task/parent - {}", parent.id);

    match state.task_service.list_for_parent(&parent).await {
        Ok(tasks) => Json(TaskMapper::to_list_response(tasks)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn list_child_tasks(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    ApiPath(child_id): ApiPath<String>,
) -> impl IntoResponse {
    info!("GET /api/task/child/{}", child_id);

    match state.task_service.list_for_child(&user, &child_id).await {
        Ok(tasks) => Json(TaskMapper::to_list_response(tasks)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_task(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    ApiPath(task_id): ApiPath<String>,
) -> impl IntoResponse {
    info!("GET /api/task/{}", task_id);

    match state.task_service.get_task(&user, &task_id).await {
        Ok(task) => Json(TaskMapper::to_dto(task)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn update_task(
    State(state): State<AppState>,
    ParentUser(parent): ParentUser,
    ApiPath(task_id): ApiPath<String>,
    ApiJson(request): ApiJson<UpdateTaskRequest>,
) -> impl IntoResponse {
    info!("PATCH /api/task/{} - request: {:?}", task_id, request);

    let command = UpdateTaskCommand {
        title: request.title,
        description: request.description,
        reward: request.reward,
    };

    match state.task_service.update_task(&parent, &task_id, command).await {
        Ok(task) => {
            let message = format!("Task '{}' updated", task.title);
            Json(TaskMapper::to_task_response(task, message)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn delete_task(
    State(state): State<AppState>,
    ParentUser(parent): ParentUser,
    ApiPath(task_id): ApiPath<String>,
) -> impl IntoResponse {
    info!("DELETE /api/task/{}", task_id);

    match state.task_service.delete_task(&parent, &task_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn transition(
    state: AppState,
    user: Authenticated,
    task_id: String,
    action: TaskAction,
) -> axum::response::Response {
    info!("PATCH /api/task/{}/{}", task_id, action);

    match state.task_service.perform(&user.0, &task_id, action).await {
        Ok(result) => Json(TaskMapper::to_transition_response(result)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn complete_task(
    State(state): State<AppState>,
    user: Authenticated,
    ApiPath(task_id): ApiPath<String>,
) -> impl IntoResponse {
    transition(state, user, task_id, TaskAction::Complete).await
}

pub async fn undo_task(
    State(state): State<AppState>,
    user: Authenticated,
    ApiPath(task_id): ApiPath<String>,
) -> impl IntoResponse {
    transition(state, user, task_id, TaskAction::Undo).await
}

pub async fn approve_task(
    State(state): State<AppState>,
    user: Authenticated,
    ApiPath(task_id): ApiPath<String>,
) -> impl IntoResponse {
    transition(state, user, task_id, TaskAction::Approve).await
}

pub async fn reject_task(
    State(state): State<AppState>,
    user: Authenticated,
    ApiPath(task_id): ApiPath<String>,
) -> impl IntoResponse {
    transition(state, user, task_id, TaskAction::Reject).await
}

pub async fn unapprove_task(
    State(state): State<AppState>,
    user: Authenticated,
    ApiPath(task_id): ApiPath<String>,
) -> impl IntoResponse {
    transition(state, user, task_id, TaskAction::Unapprove).await
}
