use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use crate::store::PgStore;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use foodgram_core::shopping_list;
use std::sync::Arc;

const ATTACHMENT: &str = "attachment; filename=\"shopping_list.txt\"";

#[utoipa::path(
    get,
    path = "/api/recipes/download_shopping_cart",
    tag = "recipes",
    responses(
        (status = 200, description = "Aggregated ingredient totals for every recipe in the cart", body = String, content_type = "text/plain"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_shopping_cart(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);
    let mut store = PgStore::new(&mut conn);

    match shopping_list::build(&mut store, user.id) {
        Ok(list) => {
            tracing::info!(user_id = %user.id, lines = list.entries.len(), "Shopping list rendered");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                    (header::CONTENT_DISPOSITION, ATTACHMENT),
                ],
                list.render(),
            )
                .into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
