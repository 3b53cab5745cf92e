use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use crate::store::PgStore;
use crate::types::IngredientResponse;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use foodgram_core::Store;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListIngredientsParams {
    /// Case-insensitive name prefix, e.g. `мук`
    pub name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/ingredients",
    tag = "ingredients",
    params(ListIngredientsParams),
    responses(
        (status = 200, description = "Ingredients ordered by name", body = Vec<IngredientResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_ingredients(
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListIngredientsParams>,
) -> impl IntoResponse {
    let prefix = params.name.as_deref().map(str::trim);

    let mut conn = get_conn!(pool);

    match PgStore::new(&mut conn).ingredients(prefix) {
        Ok(found) => {
            let found: Vec<IngredientResponse> =
                found.into_iter().map(IngredientResponse::from).collect();
            (StatusCode::OK, Json(found)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
