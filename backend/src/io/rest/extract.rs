//! Request extractors: bearer-token authentication, plus JSON bodies, query
//! strings and path segments that fail with the API's error shape.

use async_trait::async_trait;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::domain::models::account::{AuthUser, Child, Parent};
use crate::error::DomainError;
use crate::io::rest::error::ApiError;
use crate::AppState;

/// Any logged-in account, loaded fresh from the database
pub struct Authenticated(pub AuthUser);

/// A logged-in parent
pub struct ParentUser(pub Parent);

/// A logged-in child
pub struct ChildUser(pub Child);

fn bearer_token(parts: &Parts) -> Result<&str, DomainError> {
    let value = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| DomainError::Unauthorized("Missing bearer token".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| DomainError::Unauthorized("Malformed Authorization header".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user = state.auth_service.authenticate(token).await?;
        Ok(Authenticated(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ParentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Authenticated::from_request_parts(parts, state).await?.0 {
            AuthUser::Parent(parent) => Ok(ParentUser(parent)),
            AuthUser::Child(_) => Err(DomainError::forbidden("Parent account required").into()),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ChildUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Authenticated::from_request_parts(parts, state).await?.0 {
            AuthUser::Child(child) => Ok(ChildUser(child)),
            AuthUser::Parent(_) => Err(DomainError::forbidden("Child account required").into()),
        }
    }
}

/// `Json<T>` whose rejections are reported as validation errors
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection).into()),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> DomainError {
    DomainError::validation(rejection.body_text())
}

/// `Query<T>` whose rejections are reported as validation errors
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(query_rejection(rejection).into()),
        }
    }
}

fn query_rejection(rejection: QueryRejection) -> DomainError {
    DomainError::validation(rejection.body_text())
}

/// `Path<T>` whose rejections are reported as validation errors
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(path_rejection(rejection).into()),
        }
    }
}

fn path_rejection(rejection: PathRejection) -> DomainError {
    DomainError::validation(rejection.body_text())
}
