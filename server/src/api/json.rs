//! JSON request bodies whose rejections render as [`ErrorResponse`](super::ErrorResponse).
//!
//! Wrong field types become a validation error on that field; other rejections
//! (syntax, content type, body size) keep axum's status code.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use foodgram_core::Error as CoreError;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Drop-in for `axum::Json` in handler arguments.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(rejection_error(rejection)),
        }
    }
}

fn rejection_error(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(e) => {
            let (field, message) = split_data_error(&e.body_text());
            CoreError::invalid(field, message).into()
        }
        other => ApiError::Rejected(other.status(), other.body_text()),
    }
}

/// Split axum's "...target type: ingredients[0].amount: invalid type: ..." text
/// into the field path and the serde message.
fn split_data_error(text: &str) -> (String, String) {
    let detail = text.strip_prefix(DATA_ERROR_PREFIX).unwrap_or(text);
    let detail = detail
        .rsplit_once(" at line ")
        .map(|(message, _)| message)
        .unwrap_or(detail);

    match detail.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(' ') && path != "." => {
            (path.to_string(), message.to_string())
        }
        _ => ("body".to_string(), detail.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::recipes::create::RecipeRequest;
    use axum::body::Body;
    use axum::http::{self, header, StatusCode};

    fn json_request(body: impl Into<Body>) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/api/recipes")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn extract(req: Request) -> Result<RecipeRequest, ApiError> {
        ApiJson::<RecipeRequest>::from_request(req, &())
            .await
            .map(|ApiJson(r)| r)
    }

    #[test]
    fn test_split_data_error() {
        let (field, message) = split_data_error(
            "Failed to deserialize the JSON body into the target type: ingredients[0].amount: \
             invalid type: string \"two\", expected i32 at line 1 column 42",
        );
        assert_eq!(field, "ingredients[0].amount");
        assert_eq!(message, "invalid type: string \"two\", expected i32");
    }

    #[test]
    fn test_split_data_error_without_path() {
        let (field, message) = split_data_error(
            "Failed to deserialize the JSON body into the target type: invalid type: \
             sequence, expected struct RecipeRequest at line 1 column 0",
        );
        assert_eq!(field, "body");
        assert_eq!(message, "invalid type: sequence, expected struct RecipeRequest");
    }

    #[tokio::test]
    async fn test_wrong_field_type_is_a_field_error() {
        let err = extract(json_request(r#"{"name": "Щи", "cooking_time": "ten"}"#))
            .await
            .err()
            .unwrap();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let ApiError::Core(CoreError::Validation(errors)) = &err else {
            panic!("expected a validation error, got {:?}", err);
        };
        assert!(errors.has_field("cooking_time"), "{:?}", errors);
    }

    #[tokio::test]
    async fn test_nested_field_path() {
        let body = r#"{"ingredients": [{"id": "00000000-0000-0000-0000-000000000001", "amount": "two"}]}"#;
        let err = extract(json_request(body)).await.err().unwrap();
        let ApiError::Core(CoreError::Validation(errors)) = &err else {
            panic!("expected a validation error, got {:?}", err);
        };
        assert!(errors.has_field("ingredients[0].amount"), "{:?}", errors);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let err = extract(json_request("{\"name\": ")).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(err, ApiError::Rejected(..)));
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let req = http::Request::builder()
            .method("POST")
            .uri("/api/recipes")
            .body(Body::from("{}"))
            .unwrap();
        let err = extract(req).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_oversized_body_keeps_413() {
        // No DefaultBodyLimit layer here, so axum's 2MB default applies
        let image = "A".repeat(3 * 1024 * 1024);
        let body = format!(r#"{{"image": "data:image/png;base64,{}"}}"#, image);
        let err = extract(json_request(body)).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let request = extract(json_request(r#"{"name": "Щи", "cooking_time": 90}"#))
            .await
            .unwrap();
        assert_eq!(request.name, "Щи");
        assert_eq!(request.cooking_time, 90);
    }
}
