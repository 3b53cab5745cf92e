use crate::db::DbPool;
use crate::error::ApiError;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use foodgram_core::User;
use std::sync::Arc;

use super::db::get_user_from_token;
use super::extractor::bearer_token;

/// Middleware that requires a valid auth token for all requests.
/// The resolved user is stored in the request extensions, where `AuthUser` picks it up.
pub async fn require_auth(
    State(pool): State<Arc<DbPool>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let token = match bearer_token(&parts) {
        Ok(Some(token)) => token.to_string(),
        Ok(None) => {
            return ApiError::Unauthorized("Missing Authorization header".to_string())
                .into_response()
        }
        Err(e) => return e.into_response(),
    };

    let Some(user) = get_user_from_token(&pool, &token) else {
        return ApiError::Unauthorized("Invalid or expired token".to_string()).into_response();
    };

    parts.extensions.insert(User::from(user));
    next.run(Request::from_parts(parts, body)).await
}
