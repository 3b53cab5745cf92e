//! Storage abstraction.
//!
//! Service operations in this crate are generic over [`Store`]. The server
//! implements it on top of PostgreSQL; [`crate::memory::MemoryStore`] keeps
//! everything in memory for tests.
//!
//! Implementations are responsible for atomicity of multi-row writes
//! (`insert_recipe` and `replace_recipe` must be all-or-nothing) and for
//! enforcing uniqueness of join rows even under concurrent writers.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::Result;
use crate::filter::RecipeFilter;
use crate::types::{
    Ingredient, IngredientRow, NewIngredient, NewTag, Page, Paginated, Recipe, RecipeImage,
    Relation, Tag, User, ValidRecipe,
};

pub trait Store {
    fn user(&mut self, id: Uuid) -> Result<Option<User>>;

    /// All tags, ordered by name.
    fn tags(&mut self) -> Result<Vec<Tag>>;

    fn tag(&mut self, id: Uuid) -> Result<Option<Tag>>;

    /// Returns `None` if the name, color or slug is already taken.
    fn insert_tag(&mut self, tag: &NewTag) -> Result<Option<Tag>>;

    /// Ingredients ordered by name, optionally restricted to a case-insensitive name prefix.
    fn ingredients(&mut self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>>;

    fn ingredient(&mut self, id: Uuid) -> Result<Option<Ingredient>>;

    /// Insert ingredients, skipping (name, unit) pairs that already exist.
    /// Returns how many rows were actually inserted.
    fn insert_ingredients(&mut self, items: &[NewIngredient]) -> Result<usize>;

    /// The subset of `ids` with no matching tag.
    fn missing_tags(&mut self, ids: &[Uuid]) -> Result<Vec<Uuid>>;

    /// The subset of `ids` with no matching ingredient.
    fn missing_ingredients(&mut self, ids: &[Uuid]) -> Result<Vec<Uuid>>;

    fn recipe(&mut self, id: Uuid) -> Result<Option<Recipe>>;

    fn recipe_image(&mut self, id: Uuid) -> Result<Option<RecipeImage>>;

    /// Recipes matching `filter`, newest first, cut to `page`.
    /// `viewer` is the user whose favorites/cart the membership scope refers to.
    fn find_recipes(
        &mut self,
        filter: &RecipeFilter,
        viewer: Option<Uuid>,
        page: Page,
    ) -> Result<Paginated<Recipe>>;

    /// Insert a recipe with its tags and ingredients atomically. Returns the new id.
    fn insert_recipe(&mut self, author: Uuid, recipe: &ValidRecipe) -> Result<Uuid>;

    /// Replace every field, the whole tag set and the whole ingredient set atomically.
    fn replace_recipe(&mut self, id: Uuid, recipe: &ValidRecipe) -> Result<()>;

    /// Returns `false` if there was no such recipe.
    fn delete_recipe(&mut self, id: Uuid) -> Result<bool>;

    /// Returns `false` if the pair already existed.
    fn insert_relation(&mut self, relation: Relation, user: Uuid, recipe: Uuid) -> Result<bool>;

    /// Returns `false` if the pair did not exist.
    fn delete_relation(&mut self, relation: Relation, user: Uuid, recipe: Uuid) -> Result<bool>;

    /// The subset of `recipes` that `user` holds in `relation`.
    fn related_recipe_ids(
        &mut self,
        relation: Relation,
        user: Uuid,
        recipes: &[Uuid],
    ) -> Result<HashSet<Uuid>>;

    /// Every recipe in the user's shopping cart.
    fn cart_recipe_ids(&mut self, user: Uuid) -> Result<Vec<Uuid>>;

    /// One row per recipe ingredient across `recipes`, with name and unit resolved.
    fn ingredient_rows(&mut self, recipes: &[Uuid]) -> Result<Vec<IngredientRow>>;

    /// Returns `false` if the subscription already existed.
    fn insert_subscription(&mut self, follower: Uuid, author: Uuid) -> Result<bool>;

    /// Returns `false` if there was no such subscription.
    fn delete_subscription(&mut self, follower: Uuid, author: Uuid) -> Result<bool>;

    /// The subset of `authors` that `follower` is subscribed to.
    fn followed_author_ids(&mut self, follower: Uuid, authors: &[Uuid])
        -> Result<HashSet<Uuid>>;

    /// Authors the follower is subscribed to, ordered by username.
    fn subscriptions(&mut self, follower: Uuid, page: Page) -> Result<Paginated<User>>;
}
