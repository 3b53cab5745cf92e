use crate::api::json::ApiJson;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::get_conn;
use crate::store::PgStore;
use crate::types::RecipeResponse;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use foodgram_core::{recipes, IngredientAmount, RecipeDraft};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct IngredientAmountRequest {
    /// Ingredient id
    pub id: Uuid,
    pub amount: i32,
}

/// Full recipe content, used for both create and replace.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RecipeRequest {
    pub name: String,
    pub text: String,
    /// Minutes, at least 1
    pub cooking_time: i32,
    /// Base64 data URI, e.g. `data:image/png;base64,iVBORw0KGgo...`
    pub image: String,
    /// Tag ids, at least one
    pub tags: Vec<Uuid>,
    /// At least one ingredient; each ingredient at most once
    pub ingredients: Vec<IngredientAmountRequest>,
}

impl From<RecipeRequest> for RecipeDraft {
    fn from(request: RecipeRequest) -> Self {
        RecipeDraft {
            name: request.name,
            text: request.text,
            cooking_time: request.cooking_time,
            image: request.image,
            tags: request.tags,
            ingredients: request
                .ingredients
                .into_iter()
                .map(|i| IngredientAmount {
                    ingredient_id: i.id,
                    amount: i.amount,
                })
                .collect(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body = RecipeRequest,
    responses(
        (status = 201, description = "Recipe created successfully", body = RecipeResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Unknown tag or ingredient", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    ApiJson(request): ApiJson<RecipeRequest>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);
    let mut store = PgStore::new(&mut conn);

    match recipes::create(&mut store, &user, request.into()) {
        Ok(view) => (StatusCode::CREATED, Json(RecipeResponse::from(view))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_maps_ingredient_ids() {
        let id = Uuid::new_v4();
        let request: RecipeRequest = serde_json::from_value(serde_json::json!({
            "name": "Омлет",
            "text": "Взбить и пожарить",
            "cooking_time": 10,
            "image": "data:image/png;base64,AAAA",
            "tags": [],
            "ingredients": [{"id": id, "amount": 3}]
        }))
        .unwrap();

        let draft = RecipeDraft::from(request);
        assert_eq!(draft.ingredients.len(), 1);
        assert_eq!(draft.ingredients[0].ingredient_id, id);
        assert_eq!(draft.ingredients[0].amount, 3);
    }

    #[test]
    fn test_missing_fields_default_for_validation() {
        let request: RecipeRequest = serde_json::from_str("{}").unwrap();
        let draft = RecipeDraft::from(request);
        assert!(draft.name.is_empty());
        assert!(draft.ingredients.is_empty());
        assert_eq!(draft.cooking_time, 0);
    }
}
