//! HTTP translation of domain errors.
//!
//! Every failure leaves the server as `{"error": ..., "code": ...}` with the
//! status that matches its `DomainError` variant. Server errors are logged
//! before they are returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use shared::ErrorResponse;
use tracing::{error, warn};

use crate::error::DomainError;

#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Storage(_) | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {:?}", self.0);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self.0);
        }

        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_internal_errors_carry_their_message() {
        let response =
            ApiError(DomainError::Internal(anyhow::anyhow!("disk on fire"))).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert!(body.error.contains("disk on fire"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError(DomainError::validation("x")).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(DomainError::forbidden("x")).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError(DomainError::Conflict("x".into())).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError(DomainError::Unauthorized("x".into())).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
