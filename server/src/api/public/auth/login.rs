use crate::api::json::ApiJson;
use crate::api::ErrorResponse;
use crate::auth::{create_session, verify_password};
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use crate::models::User;
use crate::schema::users;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

fn invalid_credentials() -> axum::response::Response {
    ApiError::Unauthorized("Invalid credentials".to_string()).into_response()
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body(content = LoginRequest, example = json!({"email": "cook@example.com", "password": "password"})),
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(pool): State<Arc<DbPool>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let user: User = match users::table
        .filter(users::email.eq(req.email.trim().to_lowercase()))
        .select(User::as_select())
        .first(&mut conn)
        .optional()
    {
        Ok(Some(u)) => u,
        Ok(None) => return invalid_credentials(),
        Err(e) => return ApiError::from(e).into_response(),
    };

    if !verify_password(&req.password, &user.password_hash) {
        return invalid_credentials();
    }

    match create_session(&mut conn, user.id) {
        Ok(token) => {
            tracing::info!(user_id = %user.id, "user logged in");
            (StatusCode::OK, Json(LoginResponse { token })).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to create session: {}", e);
            ApiError::internal().into_response()
        }
    }
}
