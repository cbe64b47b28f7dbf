//! API error type with structured JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::clinic::ClinicError;
use crate::core_state::CoreError;
use crate::db::DatabaseError;

/// Error response body: `{"message": "...", "code": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: &'static str,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Conflict(_) | ApiError::InvalidTransition(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "INVALID_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InvalidTransition(_) => "INVALID_TRANSITION",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::RateLimited { retry_after } => {
                format!("Rate limit exceeded. Retry after {retry_after}s")
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                detail.clone()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            message,
            code: self.code(),
        };
        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after } = &self {
            if let Ok(val) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        match err {
            ClinicError::Unauthenticated(m) => ApiError::Unauthorized(m),
            ClinicError::Forbidden(m) => ApiError::Forbidden(m),
            ClinicError::NotFound(m) => ApiError::NotFound(m),
            ClinicError::InvalidRequest(m) => ApiError::BadRequest(m),
            ClinicError::Conflict(m) => ApiError::Conflict(m),
            ClinicError::InvalidTransition(m) => ApiError::InvalidTransition(m),
            ClinicError::Database(e) => ApiError::from(e),
            ClinicError::Crypto(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, .. } => {
                ApiError::NotFound(format!("{entity_type} not found"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Database(e) => ApiError::from(e),
            CoreError::Config(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn clinic_errors_map_to_statuses() {
        let cases = [
            (ClinicError::Unauthenticated("no".into()), StatusCode::UNAUTHORIZED),
            (ClinicError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ClinicError::NotFound("no".into()), StatusCode::NOT_FOUND),
            (ClinicError::InvalidRequest("no".into()), StatusCode::BAD_REQUEST),
            (ClinicError::Conflict("no".into()), StatusCode::BAD_REQUEST),
            (ClinicError::InvalidTransition("no".into()), StatusCode::BAD_REQUEST),
            (
                ClinicError::Database(DatabaseError::ConstraintViolation("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn body_carries_message_and_code() {
        let response =
            ApiError::from(ClinicError::Conflict("This time slot is already booked".into()))
                .into_response();
        let json = body_json(response).await;
        assert_eq!(json["message"], "This time slot is already booked");
        assert_eq!(json["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn internal_errors_surface_message_only() {
        let response = ApiError::Internal("disk I/O error".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["message"], "disk I/O error");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited { retry_after: 60 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "60");
    }

    #[test]
    fn repository_not_found_maps_to_404() {
        let err = ApiError::from(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: "x".into(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Appointment not found");
    }
}
