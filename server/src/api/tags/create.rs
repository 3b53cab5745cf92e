use crate::api::json::ApiJson;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use crate::store::PgStore;
use crate::types::TagResponse;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use foodgram_core::validate::validate_tag;
use foodgram_core::{Error, NewTag, Store};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateTagRequest {
    pub name: String,
    /// HEX color, e.g. `#49B64E`
    pub color: String,
    pub slug: String,
}

#[utoipa::path(
    post,
    path = "/api/tags",
    tag = "tags",
    request_body(content = CreateTagRequest, example = json!({"name": "Завтрак", "color": "#E26C2D", "slug": "breakfast"})),
    responses(
        (status = 201, description = "Tag created successfully", body = TagResponse),
        (status = 400, description = "Invalid name, color or slug", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Only administrators can create tags", body = ErrorResponse),
        (status = 409, description = "Name, color or slug already taken", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_tag(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    ApiJson(request): ApiJson<CreateTagRequest>,
) -> impl IntoResponse {
    if !user.is_admin {
        return ApiError::from(Error::Forbidden(
            "Only administrators can create tags".to_string(),
        ))
        .into_response();
    }

    let tag = match validate_tag(&NewTag {
        name: request.name,
        color: request.color,
        slug: request.slug,
    }) {
        Ok(tag) => tag,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let mut conn = get_conn!(pool);

    match PgStore::new(&mut conn).insert_tag(&tag) {
        Ok(Some(created)) => {
            tracing::info!(tag_id = %created.id, slug = %created.slug, "tag created");
            (StatusCode::CREATED, Json(TagResponse::from(created))).into_response()
        }
        Ok(None) => ApiError::from(Error::Conflict(
            "A tag with this name, color or slug already exists".to_string(),
        ))
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
