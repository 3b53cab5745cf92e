//! JSON shapes shared by several endpoints.

use chrono::{DateTime, Utc};
use foodgram_core::{
    AuthorView, Ingredient, Paginated, RecipeIngredient, RecipeSummary, RecipeView, Tag, User,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the current viewer follows this user
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn new(user: User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    /// HEX color, e.g. `#49B64E`
    pub color: String,
    pub slug: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientResponse {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientResponse {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeIngredientResponse {
    /// Ingredient id
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipeIngredient> for RecipeIngredientResponse {
    fn from(item: RecipeIngredient) -> Self {
        Self {
            id: item.ingredient_id,
            name: item.name,
            measurement_unit: item.measurement_unit,
            amount: item.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub author: UserResponse,
    pub name: String,
    pub text: String,
    /// Minutes
    pub cooking_time: i32,
    /// URL of the recipe image
    pub image: String,
    pub tags: Vec<TagResponse>,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub created_at: DateTime<Utc>,
}

pub fn image_url(recipe_id: Uuid) -> String {
    format!("/api/recipes/{}/image", recipe_id)
}

impl From<RecipeView> for RecipeResponse {
    fn from(view: RecipeView) -> Self {
        let recipe = view.recipe;
        Self {
            id: recipe.id,
            author: UserResponse::new(recipe.author, view.author_is_subscribed),
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            image: image_url(recipe.id),
            tags: recipe.tags.into_iter().map(TagResponse::from).collect(),
            ingredients: recipe
                .ingredients
                .into_iter()
                .map(RecipeIngredientResponse::from)
                .collect(),
            is_favorited: view.is_favorited,
            is_in_shopping_cart: view.is_in_shopping_cart,
            created_at: recipe.created_at,
        }
    }
}

/// Short recipe form returned by favorite/cart toggles and subscription previews.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeSummaryResponse {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<RecipeSummary> for RecipeSummaryResponse {
    fn from(summary: RecipeSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            image: image_url(summary.id),
            cooking_time: summary.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<RecipeSummaryResponse>,
    pub recipes_count: i64,
}

impl From<AuthorView> for AuthorResponse {
    fn from(view: AuthorView) -> Self {
        Self {
            user: UserResponse::new(view.user, view.is_subscribed),
            recipes: view
                .recipes
                .into_iter()
                .map(RecipeSummaryResponse::from)
                .collect(),
            recipes_count: view.recipes_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginationMetadata {
    /// Total number of items across all pages
    pub count: i64,
    pub page: u32,
    pub limit: u32,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
}

impl PaginationMetadata {
    pub fn of<T>(page: &Paginated<T>) -> Self {
        let number = page.page.number;
        Self {
            count: page.total,
            page: number,
            limit: page.page.limit,
            next_page: page.has_next().then(|| number + 1),
            previous_page: (number > 1).then(|| number - 1),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeListResponse {
    pub results: Vec<RecipeResponse>,
    pub pagination: PaginationMetadata,
}

impl From<Paginated<RecipeView>> for RecipeListResponse {
    fn from(page: Paginated<RecipeView>) -> Self {
        let pagination = PaginationMetadata::of(&page);
        Self {
            results: page.items.into_iter().map(RecipeResponse::from).collect(),
            pagination,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorListResponse {
    pub results: Vec<AuthorResponse>,
    pub pagination: PaginationMetadata,
}

impl From<Paginated<AuthorView>> for AuthorListResponse {
    fn from(page: Paginated<AuthorView>) -> Self {
        let pagination = PaginationMetadata::of(&page);
        Self {
            results: page.items.into_iter().map(AuthorResponse::from).collect(),
            pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodgram_core::Page;

    #[test]
    fn test_pagination_links() {
        let first = Page::new(Some(1), Some(6)).slice((0..13).collect::<Vec<i32>>());
        let meta = PaginationMetadata::of(&first);
        assert_eq!(meta.count, 13);
        assert_eq!(meta.next_page, Some(2));
        assert_eq!(meta.previous_page, None);

        let last = Page::new(Some(3), Some(6)).slice((0..13).collect::<Vec<i32>>());
        let meta = PaginationMetadata::of(&last);
        assert_eq!(meta.next_page, None);
        assert_eq!(meta.previous_page, Some(2));
    }

    #[test]
    fn test_image_url() {
        let id = Uuid::nil();
        assert_eq!(
            image_url(id),
            "/api/recipes/00000000-0000-0000-0000-000000000000/image"
        );
    }
}
