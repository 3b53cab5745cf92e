use crate::api::json::ApiJson;
use crate::api::ErrorResponse;
use crate::auth::{create_session, hash_password};
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use crate::models::{NewUser, User};
use crate::schema::users;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use foodgram_core::{Error, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

const MAX_USER_FIELD_LEN: usize = 150;
const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignupResponse {
    pub user_id: Uuid,
    pub token: String,
}

/// Letters, digits and `@ . + - _`, like the usernames most auth systems accept.
fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

fn validate(req: &SignupRequest) -> Result<(), Error> {
    let mut errors = ValidationErrors::new();

    let email = req.email.trim();
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if email.len() > MAX_EMAIL_LEN || !email.contains('@') || email.starts_with('@') {
        errors.add("email", "Enter a valid email address");
    }

    let username = req.username.trim();
    if username.is_empty() {
        errors.add("username", "Username is required");
    } else if username.chars().count() > MAX_USER_FIELD_LEN || !is_valid_username(username) {
        errors.add(
            "username",
            "Use at most 150 letters, digits and @/./+/-/_ characters",
        );
    }

    for (field, value) in [("first_name", &req.first_name), ("last_name", &req.last_name)] {
        if value.trim().is_empty() {
            errors.add(field, "This field is required");
        } else if value.trim().chars().count() > MAX_USER_FIELD_LEN {
            errors.add(field, "Must be at most 150 characters");
        }
    }

    if req.password.is_empty() {
        errors.add("password", "Password is required");
    }

    errors.into_result()
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body(content = SignupRequest, example = json!({
        "email": "cook@example.com",
        "username": "cook",
        "first_name": "Ivan",
        "last_name": "Petrov",
        "password": "password"
    })),
    responses(
        (status = 201, description = "User created successfully", body = SignupResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email or username already exists", body = ErrorResponse)
    )
)]
pub async fn signup(
    State(pool): State<Arc<DbPool>>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate(&req) {
        return ApiError::from(e).into_response();
    }

    let password_hash = match hash_password(&req.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Failed to hash password: {}", e);
            return ApiError::internal().into_response();
        }
    };

    let mut conn = get_conn!(pool);

    let email = req.email.trim().to_lowercase();
    let new_user = NewUser {
        email: &email,
        username: req.username.trim(),
        first_name: req.first_name.trim(),
        last_name: req.last_name.trim(),
        password_hash: &password_hash,
    };

    let user: User = match diesel::insert_into(users::table)
        .values(&new_user)
        .returning(User::as_returning())
        .get_result(&mut conn)
    {
        Ok(u) => u,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return ApiError::from(Error::Conflict(
                "A user with this email or username already exists".to_string(),
            ))
            .into_response()
        }
        Err(e) => return ApiError::from(e).into_response(),
    };

    let token = match create_session(&mut conn, user.id) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to create session: {}", e);
            return ApiError::internal().into_response();
        }
    };

    tracing::info!(user_id = %user.id, "user signed up");
    (
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: user.id,
            token,
        }),
    )
        .into_response()
}
