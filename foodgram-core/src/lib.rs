pub mod error;
pub mod filter;
pub mod image;
pub mod import;
pub mod memory;
pub mod recipes;
pub mod relations;
pub mod shopping_list;
pub mod store;
pub mod subscriptions;
pub mod types;
pub mod validate;

pub use error::{Error, FieldError, Result, ValidationErrors};
pub use filter::{Membership, RecipeFilter};
pub use import::{import_ingredients, parse_ingredients, ImportError, ImportFormat};
pub use memory::MemoryStore;
pub use shopping_list::{ShoppingList, ShoppingListEntry};
pub use store::Store;
pub use types::{
    AuthorView, Ingredient, IngredientAmount, IngredientRow, NewIngredient, NewTag, Page,
    Paginated, Recipe, RecipeDraft, RecipeImage, RecipeIngredient, RecipeSummary, RecipeView,
    Relation, Tag, User, ValidRecipe, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
