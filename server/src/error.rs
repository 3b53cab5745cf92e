//! HTTP rendering of failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use foodgram_core::Error as CoreError;
use thiserror::Error;

use crate::api::{ErrorResponse, FieldErrorResponse};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    /// A request body axum refused to extract (syntax, content type, size).
    #[error("{1}")]
    Rejected(StatusCode, String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn internal() -> Self {
        ApiError::Internal
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(CoreError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Core(CoreError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Core(CoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Core(CoreError::Forbidden(_)) => StatusCode::FORBIDDEN,
            ApiError::Core(CoreError::Storage(_)) | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected(status, _) => *status,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::Core(CoreError::Validation(errors)) => ErrorResponse {
                error: "Validation failed".to_string(),
                fields: Some(
                    errors
                        .fields()
                        .iter()
                        .map(|f| FieldErrorResponse {
                            field: f.field.clone(),
                            message: f.message.clone(),
                        })
                        .collect(),
                ),
            },
            // Storage details stay in the logs
            ApiError::Core(CoreError::Storage(_)) | ApiError::Internal => {
                ErrorResponse::new("Internal server error")
            }
            other => ErrorResponse::new(other.to_string()),
        }
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(e: diesel::result::Error) -> Self {
        ApiError::Core(CoreError::Storage(e.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, detail = ?self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodgram_core::ValidationErrors;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::Core(CoreError::Validation(ValidationErrors::new())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Core(CoreError::Conflict("dup".to_string())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Core(CoreError::not_found("Recipe")),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Core(CoreError::Forbidden("no".to_string())),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::Core(CoreError::Storage("boom".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::Unauthorized("who".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (ApiError::Internal, StatusCode::INTERNAL_SERVER_ERROR),
            (
                ApiError::Rejected(StatusCode::PAYLOAD_TOO_LARGE, "too big".to_string()),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{:?}", error);
        }
    }

    #[test]
    fn test_validation_body_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("ingredients", "At least one ingredient is required");
        errors.add("cooking_time", "Must be at least 1 minute");

        let body = ApiError::Core(CoreError::Validation(errors)).body();
        let fields = body.fields.unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "ingredients");
        assert_eq!(fields[1].field, "cooking_time");
    }

    #[test]
    fn test_storage_details_are_hidden() {
        let body = ApiError::Core(CoreError::Storage("relation \"x\" does not exist".to_string()))
            .body();
        assert_eq!(body.error, "Internal server error");
        assert!(body.fields.is_none());
    }

    #[test]
    fn test_not_found_message() {
        let body = ApiError::Core(CoreError::not_found("Recipe")).body();
        assert_eq!(body.error, "Recipe not found");
    }
}
