use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 6;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    /// HEX color code, e.g. `#49B64E`
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

/// An ingredient reference with a quantity, as submitted when writing a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngredientAmount {
    pub ingredient_id: Uuid,
    pub amount: i32,
}

/// An ingredient as it appears inside a stored recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredient {
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeImage {
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub author: User,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    pub fn summary(&self) -> RecipeSummary {
        RecipeSummary {
            id: self.id,
            name: self.name.clone(),
            cooking_time: self.cooking_time,
        }
    }
}

/// Short form of a recipe, used in relation and subscription responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub cooking_time: i32,
}

/// Recipe input before validation. The image is a base64 `data:` URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: String,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmount>,
}

/// A recipe that passed validation and is ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: RecipeImage,
    pub tag_ids: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmount>,
}

/// A recipe decorated with flags relative to the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeView {
    pub recipe: Recipe,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub author_is_subscribed: bool,
}

/// A followed author with a preview of their newest recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorView {
    pub user: User,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

/// A flat (ingredient, quantity) row of a recipe, the input of shopping list aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// User-to-recipe join relations that carry no state of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Favorite,
    ShoppingCart,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Favorite => "favorites",
            Relation::ShoppingCart => "shopping cart",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub number: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    /// Build a page from raw query values, clamping them into range.
    pub fn new(number: Option<i64>, limit: Option<i64>) -> Self {
        let number = number.unwrap_or(1).clamp(1, u32::MAX as i64) as u32;
        let limit = limit
            .unwrap_or(DEFAULT_PAGE_SIZE as i64)
            .clamp(1, MAX_PAGE_SIZE as i64) as u32;
        Self { number, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.number as i64 - 1) * self.limit as i64
    }

    /// Cut one page out of an already ordered collection.
    pub fn slice<T>(&self, items: Vec<T>) -> Paginated<T> {
        let total = items.len() as i64;
        let items = items
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.limit as usize)
            .collect();
        Paginated {
            items,
            total,
            page: *self,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// Number of items across all pages
    pub total: i64,
    pub page: Page,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page.offset() + (self.items.len() as i64) < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::new(None, None);
        assert_eq!(page.number, 1);
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_clamps() {
        let page = Page::new(Some(0), Some(10_000));
        assert_eq!(page.number, 1);
        assert_eq!(page.limit, MAX_PAGE_SIZE);

        let page = Page::new(Some(-3), Some(0));
        assert_eq!(page.number, 1);
        assert_eq!(page.limit, 1);
    }

    #[test]
    fn test_slice_second_page() {
        let page = Page::new(Some(2), Some(3));
        let sliced = page.slice((1..=8).collect::<Vec<_>>());
        assert_eq!(sliced.items, vec![4, 5, 6]);
        assert_eq!(sliced.total, 8);
        assert!(sliced.has_next());

        let last = Page::new(Some(3), Some(3)).slice((1..=8).collect::<Vec<_>>());
        assert_eq!(last.items, vec![7, 8]);
        assert!(!last.has_next());
    }
}
