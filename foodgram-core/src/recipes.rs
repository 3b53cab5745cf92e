use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::filter::RecipeFilter;
use crate::store::Store;
use crate::types::{
    Page, Paginated, Recipe, RecipeDraft, RecipeImage, RecipeView, Relation, User, ValidRecipe,
};
use crate::validate::validate_recipe;

pub fn create<S: Store>(store: &mut S, author: &User, draft: RecipeDraft) -> Result<RecipeView> {
    let recipe = validate_recipe(draft)?;
    ensure_references(store, &recipe)?;

    let id = store.insert_recipe(author.id, &recipe)?;
    tracing::info!(recipe_id = %id, author_id = %author.id, "recipe created");

    get(store, Some(author.id), id)
}

/// Replace a recipe's contents. Only the author or an admin may do this.
pub fn update<S: Store>(
    store: &mut S,
    actor: &User,
    id: Uuid,
    draft: RecipeDraft,
) -> Result<RecipeView> {
    let existing = store
        .recipe(id)?
        .ok_or_else(|| Error::not_found("Recipe"))?;
    ensure_can_modify(actor, &existing)?;

    let recipe = validate_recipe(draft)?;
    ensure_references(store, &recipe)?;

    store.replace_recipe(id, &recipe)?;
    tracing::info!(recipe_id = %id, actor_id = %actor.id, "recipe updated");

    get(store, Some(actor.id), id)
}

pub fn delete<S: Store>(store: &mut S, actor: &User, id: Uuid) -> Result<()> {
    let existing = store
        .recipe(id)?
        .ok_or_else(|| Error::not_found("Recipe"))?;
    ensure_can_modify(actor, &existing)?;

    if !store.delete_recipe(id)? {
        return Err(Error::not_found("Recipe"));
    }
    tracing::info!(recipe_id = %id, actor_id = %actor.id, "recipe deleted");
    Ok(())
}

pub fn get<S: Store>(store: &mut S, viewer: Option<Uuid>, id: Uuid) -> Result<RecipeView> {
    let recipe = store
        .recipe(id)?
        .ok_or_else(|| Error::not_found("Recipe"))?;
    let mut views = decorate(store, viewer, vec![recipe])?;
    views
        .pop()
        .ok_or_else(|| Error::Storage("recipe vanished while decorating".to_string()))
}

pub fn list<S: Store>(
    store: &mut S,
    viewer: Option<Uuid>,
    filter: &RecipeFilter,
    page: Page,
) -> Result<Paginated<RecipeView>> {
    let found = store.find_recipes(filter, viewer, page)?;
    let views = decorate(store, viewer, found.items)?;
    Ok(Paginated {
        items: views,
        total: found.total,
        page: found.page,
    })
}

pub fn image<S: Store>(store: &mut S, id: Uuid) -> Result<RecipeImage> {
    store
        .recipe_image(id)?
        .ok_or_else(|| Error::not_found("Recipe image"))
}

fn ensure_can_modify(actor: &User, recipe: &Recipe) -> Result<()> {
    if actor.is_admin || recipe.author.id == actor.id {
        Ok(())
    } else {
        Err(Error::Forbidden(
            "Only the author or an administrator can modify this recipe".to_string(),
        ))
    }
}

fn ensure_references<S: Store>(store: &mut S, recipe: &ValidRecipe) -> Result<()> {
    if let Some(id) = store.missing_tags(&recipe.tag_ids)?.first() {
        return Err(Error::not_found(format!("Tag {}", id)));
    }

    let ingredient_ids: Vec<Uuid> = recipe.ingredients.iter().map(|i| i.ingredient_id).collect();
    if let Some(id) = store.missing_ingredients(&ingredient_ids)?.first() {
        return Err(Error::not_found(format!("Ingredient {}", id)));
    }

    Ok(())
}

/// Attach the per-viewer flags, using one batched lookup per relation.
fn decorate<S: Store>(
    store: &mut S,
    viewer: Option<Uuid>,
    recipes: Vec<Recipe>,
) -> Result<Vec<RecipeView>> {
    let Some(viewer) = viewer else {
        return Ok(recipes
            .into_iter()
            .map(|recipe| RecipeView {
                recipe,
                is_favorited: false,
                is_in_shopping_cart: false,
                author_is_subscribed: false,
            })
            .collect());
    };

    let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let authors: Vec<Uuid> = recipes
        .iter()
        .map(|r| r.author.id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let favorites = store.related_recipe_ids(Relation::Favorite, viewer, &ids)?;
    let cart = store.related_recipe_ids(Relation::ShoppingCart, viewer, &ids)?;
    let followed = store.followed_author_ids(viewer, &authors)?;

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeView {
            is_favorited: favorites.contains(&recipe.id),
            is_in_shopping_cart: cart.contains(&recipe.id),
            author_is_subscribed: followed.contains(&recipe.author.id),
            recipe,
        })
        .collect())
}
