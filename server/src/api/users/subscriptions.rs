use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use crate::store::PgStore;
use crate::types::AuthorListResponse;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use foodgram_core::subscriptions::{self, DEFAULT_RECIPES_LIMIT};
use foodgram_core::{Page, MAX_PAGE_SIZE};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SubscriptionsParams {
    /// Page number, starting at 1
    pub page: Option<i64>,
    /// Authors per page (default: 6, max: 100)
    pub limit: Option<i64>,
    /// Recipes previewed per author (default: 3)
    pub recipes_limit: Option<i64>,
}

fn recipes_limit(requested: Option<i64>) -> u32 {
    requested
        .map(|n| n.clamp(0, MAX_PAGE_SIZE as i64) as u32)
        .unwrap_or(DEFAULT_RECIPES_LIMIT)
}

#[utoipa::path(
    get,
    path = "/api/users/subscriptions",
    tag = "users",
    params(SubscriptionsParams),
    responses(
        (status = 200, description = "Followed authors with their newest recipes", body = AuthorListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_subscriptions(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<SubscriptionsParams>,
) -> impl IntoResponse {
    let page = Page::new(params.page, params.limit);
    let limit = recipes_limit(params.recipes_limit);

    let mut conn = get_conn!(pool);
    let mut store = PgStore::new(&mut conn);

    match subscriptions::list(&mut store, user.id, page, limit) {
        Ok(authors) => (StatusCode::OK, Json(AuthorListResponse::from(authors))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipes_limit() {
        assert_eq!(recipes_limit(None), DEFAULT_RECIPES_LIMIT);
        assert_eq!(recipes_limit(Some(5)), 5);
        assert_eq!(recipes_limit(Some(-2)), 0);
        assert_eq!(recipes_limit(Some(10_000)), MAX_PAGE_SIZE);
    }
}
