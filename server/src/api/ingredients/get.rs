use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use crate::store::PgStore;
use crate::types::IngredientResponse;
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
    path = "/api/ingredients/{id}",
    tag = "ingredients",
    params(
        ("id" = Uuid, Path, description = "Ingredient ID")
    ),
    responses(
        (status = 200, description = "Ingredient", body = IngredientResponse),
        (status = 404, description = "Ingredient not found", body = ErrorResponse)
    )
)]
pub async fn get_ingredient(
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match PgStore::new(&mut conn).ingredient(id) {
        Ok(Some(ingredient)) => {
            (StatusCode::OK, Json(IngredientResponse::from(ingredient))).into_response()
        }
        Ok(None) => ApiError::from(Error::not_found("Ingredient")).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
