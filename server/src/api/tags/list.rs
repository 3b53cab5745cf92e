use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use crate::store::PgStore;
use crate::types::TagResponse;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use foodgram_core::Store;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "tags",
    responses(
        (status = 200, description = "All tags, ordered by name", body = Vec<TagResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_tags(State(pool): State<Arc<DbPool>>) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match PgStore::new(&mut conn).tags() {
        Ok(tags) => {
            let tags: Vec<TagResponse> = tags.into_iter().map(TagResponse::from).collect();
            (StatusCode::OK, Json(tags)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
