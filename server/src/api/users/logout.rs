use crate::api::ErrorResponse;
use crate::auth::{delete_session, AuthUser, SessionToken};
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/users/logout",
    tag = "users",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout(
    AuthUser(user): AuthUser,
    SessionToken(token): SessionToken,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match delete_session(&mut conn, &token) {
        Ok(_) => {
            tracing::info!(user_id = %user.id, "Session revoked");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
