//! Favorites and shopping cart toggles.
//!
//! Both are plain (user, recipe) pairs. Adding an existing pair is a conflict,
//! removing a missing pair is not-found.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{RecipeSummary, Relation};

pub fn add<S: Store>(
    store: &mut S,
    relation: Relation,
    user: Uuid,
    recipe_id: Uuid,
) -> Result<RecipeSummary> {
    let recipe = store
        .recipe(recipe_id)?
        .ok_or_else(|| Error::not_found("Recipe"))?;

    if !store.insert_relation(relation, user, recipe_id)? {
        return Err(Error::Conflict(format!(
            "Recipe is already in {}",
            relation.as_str()
        )));
    }

    tracing::debug!(user_id = %user, recipe_id = %recipe_id, relation = relation.as_str(), "added");
    Ok(recipe.summary())
}

pub fn remove<S: Store>(
    store: &mut S,
    relation: Relation,
    user: Uuid,
    recipe_id: Uuid,
) -> Result<()> {
    if !store.delete_relation(relation, user, recipe_id)? {
        return Err(Error::not_found(format!(
            "Recipe in {}",
            relation.as_str()
        )));
    }

    tracing::debug!(user_id = %user, recipe_id = %recipe_id, relation = relation.as_str(), "removed");
    Ok(())
}
