use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use crate::store::PgStore;
use crate::types::TagResponse;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use foodgram_core::{Error, Store};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/tags/{id}",
    tag = "tags",
    params(
        ("id" = Uuid, Path, description = "Tag ID")
    ),
    responses(
        (status = 200, description = "Tag", body = TagResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    )
)]
pub async fn get_tag(State(pool): State<Arc<DbPool>>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match PgStore::new(&mut conn).tag(id) {
        Ok(Some(tag)) => (StatusCode::OK, Json(TagResponse::from(tag))).into_response(),
        Ok(None) => ApiError::from(Error::not_found("Tag")).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
