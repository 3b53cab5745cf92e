use crate::api::ErrorResponse;
use crate::auth::MaybeAuthUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use crate::store::PgStore;
use crate::types::RecipeListResponse;
use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use foodgram_core::{recipes, Page, RecipeFilter};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

/// Query parameters for the recipe list. Only used for the OpenAPI document;
/// the handler parses the raw query so that `tags` can repeat.
#[derive(Debug, Deserialize, IntoParams)]
#[allow(dead_code)]
pub struct ListRecipesParams {
    /// Tag slug; repeat the parameter to match recipes with ANY of the tags
    pub tags: Option<Vec<String>>,
    /// Only recipes by this author
    pub author: Option<Uuid>,
    /// `1` to restrict to the caller's favorites (ignored when anonymous)
    pub is_favorited: Option<String>,
    /// `1` to restrict to the caller's shopping cart (ignored when anonymous)
    pub is_in_shopping_cart: Option<String>,
    /// Page number, starting at 1
    pub page: Option<i64>,
    /// Recipes per page (default: 6, max: 100)
    pub limit: Option<i64>,
}

#[derive(Debug, Default, PartialEq)]
struct ListQuery {
    filter: RecipeFilter,
    page: Option<i64>,
    limit: Option<i64>,
}

fn parse_flag(key: &str, value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "" | "0" | "false" => Ok(false),
        _ => Err(format!("Invalid value for {}: {}", key, value)),
    }
}

fn parse_number(key: &str, value: &str) -> Result<i64, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid value for {}: {}", key, value))
}

fn parse_query(raw: Option<&str>) -> Result<ListQuery, String> {
    let mut query = ListQuery::default();
    let Some(raw) = raw else {
        return Ok(query);
    };

    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        match key.as_ref() {
            "tags" => {
                let slug = value.trim();
                if !slug.is_empty() {
                    query.filter.tags.push(slug.to_string());
                }
            }
            "author" => {
                let author = Uuid::parse_str(&value)
                    .map_err(|_| format!("Invalid value for author: {}", value))?;
                query.filter.author = Some(author);
            }
            "is_favorited" => query.filter.is_favorited = parse_flag(&key, &value)?,
            "is_in_shopping_cart" => {
                query.filter.is_in_shopping_cart = parse_flag(&key, &value)?
            }
            "page" => query.page = Some(parse_number(&key, &value)?),
            "limit" => query.limit = Some(parse_number(&key, &value)?),
            _ => {}
        }
    }

    Ok(query)
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(ListRecipesParams),
    responses(
        (status = 200, description = "Recipes, newest first", body = RecipeListResponse),
        (status = 400, description = "Invalid query parameter", body = ErrorResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse)
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn list_recipes(
    viewer: MaybeAuthUser,
    State(pool): State<Arc<DbPool>>,
    RawQuery(raw): RawQuery,
) -> impl IntoResponse {
    let query = match parse_query(raw.as_deref()) {
        Ok(q) => q,
        Err(message) => return ApiError::BadRequest(message).into_response(),
    };
    let page = Page::new(query.page, query.limit);

    let mut conn = get_conn!(pool);
    let mut store = PgStore::new(&mut conn);

    match recipes::list(&mut store, viewer.id(), &query.filter, page) {
        Ok(found) => (StatusCode::OK, Json(RecipeListResponse::from(found))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_query() {
        assert_eq!(parse_query(None).unwrap(), ListQuery::default());
        assert_eq!(parse_query(Some("")).unwrap(), ListQuery::default());
    }

    #[test]
    fn test_parse_repeated_tags() {
        let parsed = parse_query(Some("tags=breakfast&tags=dinner")).unwrap();
        assert_eq!(parsed.filter.tags, vec!["breakfast", "dinner"]);
    }

    #[test]
    fn test_parse_skips_blank_tags() {
        let parsed = parse_query(Some("tags=&tags=lunch&tags=%20")).unwrap();
        assert_eq!(parsed.filter.tags, vec!["lunch"]);
    }

    #[test]
    fn test_parse_author_and_flags() {
        let author = Uuid::new_v4();
        let parsed = parse_query(Some(&format!(
            "author={}&is_favorited=1&is_in_shopping_cart=false",
            author
        )))
        .unwrap();
        assert_eq!(parsed.filter.author, Some(author));
        assert!(parsed.filter.is_favorited);
        assert!(!parsed.filter.is_in_shopping_cart);
    }

    #[test]
    fn test_parse_pagination() {
        let parsed = parse_query(Some("page=3&limit=12")).unwrap();
        assert_eq!(parsed.page, Some(3));
        assert_eq!(parsed.limit, Some(12));
    }

    #[test]
    fn test_parse_ignores_unknown_keys() {
        let parsed = parse_query(Some("ordering=-name&tags=dinner")).unwrap();
        assert_eq!(parsed.filter.tags, vec!["dinner"]);
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(parse_query(Some("author=not-a-uuid")).is_err());
        assert!(parse_query(Some("is_favorited=maybe")).is_err());
        assert!(parse_query(Some("page=two")).is_err());
    }
}
