//! PostgreSQL implementation of [`foodgram_core::Store`].
//!
//! Every operation opens a `db.query` span so per-request query counts show up
//! in telemetry. Multi-row writes run in a single transaction, and join-row
//! inserts use `ON CONFLICT DO NOTHING` so a racing duplicate is reported as
//! "already present" instead of failing.

use std::collections::{HashMap, HashSet};

use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use foodgram_core::{
    Error, Ingredient, IngredientRow, NewIngredient, NewTag, Page, Paginated, Recipe,
    RecipeFilter, RecipeImage, RecipeIngredient, Relation, Result, Store, Tag, User, ValidRecipe,
};
use uuid::Uuid;

use crate::models;
use crate::schema::{
    favorites, ingredients, recipe_ingredients, recipe_tags, recipes, shopping_cart_items,
    subscriptions, tags, users,
};
use crate::telemetry::db_query;

/// Rows per multi-row INSERT; keeps bind parameters well under the protocol limit.
const INSERT_CHUNK: usize = 1000;

pub struct PgStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgStore<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

fn storage(e: diesel::result::Error) -> Error {
    Error::Storage(e.to_string())
}

/// A join row whose parent was deleted after the service checked it exists.
fn missing_parent(what: &'static str) -> impl Fn(DieselError) -> Error {
    move |e| match e {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            Error::not_found(what)
        }
        other => storage(other),
    }
}

diesel::define_sql_function!(fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text);

/// Ingredient search by case-insensitive name prefix, shaped to use
/// `idx_ingredients_lower_name` (`LOWER(name) text_pattern_ops`).
fn ingredient_search(name_prefix: Option<&str>) -> ingredients::BoxedQuery<'static, Pg> {
    let mut query = ingredients::table
        .order((ingredients::name.asc(), ingredients::measurement_unit.asc()))
        .into_boxed();
    if let Some(prefix) = name_prefix.filter(|p| !p.is_empty()) {
        query = query.filter(lower(ingredients::name).like(lower(like_prefix(prefix))));
    }
    query
}

/// Escape LIKE wildcards in user input.
fn like_prefix(prefix: &str) -> String {
    let escaped = prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{}%", escaped)
}

/// The WHERE part of a recipe list query. Tag OR and membership scopes become subselects.
fn filtered_recipes<'f>(
    filter: &'f RecipeFilter,
    membership_viewer: Option<Uuid>,
) -> recipes::BoxedQuery<'f, Pg> {
    let mut query = recipes::table.into_boxed();

    if !filter.tags.is_empty() {
        query = query.filter(
            recipes::id.eq_any(
                recipe_tags::table
                    .inner_join(tags::table)
                    .filter(tags::slug.eq_any(&filter.tags))
                    .select(recipe_tags::recipe_id),
            ),
        );
    }

    if let Some(author) = filter.author {
        query = query.filter(recipes::author_id.eq(author));
    }

    if let Some(viewer) = membership_viewer {
        if filter.is_favorited {
            query = query.filter(
                recipes::id.eq_any(
                    favorites::table
                        .filter(favorites::user_id.eq(viewer))
                        .select(favorites::recipe_id),
                ),
            );
        }
        if filter.is_in_shopping_cart {
            query = query.filter(
                recipes::id.eq_any(
                    shopping_cart_items::table
                        .filter(shopping_cart_items::user_id.eq(viewer))
                        .select(shopping_cart_items::recipe_id),
                ),
            );
        }
    }

    query
}

impl PgStore<'_> {
    /// Attach authors, tags and ingredients to recipe rows, three queries for the whole batch.
    fn hydrate(&mut self, rows: Vec<models::Recipe>) -> Result<Vec<Recipe>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let author_ids: Vec<Uuid> = rows
            .iter()
            .map(|r| r.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let authors: HashMap<Uuid, User> = db_query("recipe_authors", || {
            users::table
                .filter(users::id.eq_any(&author_ids))
                .select(models::User::as_select())
                .load(self.conn)
        })
        .map_err(storage)?
        .into_iter()
        .map(|u| (u.id, User::from(u)))
        .collect();

        let tag_rows: Vec<(Uuid, models::Tag)> = db_query("recipe_tags", || {
            recipe_tags::table
                .inner_join(tags::table)
                .filter(recipe_tags::recipe_id.eq_any(&ids))
                .order(tags::name.asc())
                .select((recipe_tags::recipe_id, models::Tag::as_select()))
                .load(self.conn)
        })
        .map_err(storage)?;

        let mut tags_by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for (recipe_id, tag) in tag_rows {
            tags_by_recipe.entry(recipe_id).or_default().push(tag.into());
        }

        let ingredient_rows: Vec<(Uuid, Uuid, String, String, i32)> =
            db_query("recipe_ingredients", || {
                recipe_ingredients::table
                    .inner_join(ingredients::table)
                    .filter(recipe_ingredients::recipe_id.eq_any(&ids))
                    .order((ingredients::name.asc(), ingredients::measurement_unit.asc()))
                    .select((
                        recipe_ingredients::recipe_id,
                        ingredients::id,
                        ingredients::name,
                        ingredients::measurement_unit,
                        recipe_ingredients::amount,
                    ))
                    .load(self.conn)
            })
            .map_err(storage)?;

        let mut ingredients_by_recipe: HashMap<Uuid, Vec<RecipeIngredient>> = HashMap::new();
        for (recipe_id, ingredient_id, name, measurement_unit, amount) in ingredient_rows {
            ingredients_by_recipe
                .entry(recipe_id)
                .or_default()
                .push(RecipeIngredient {
                    ingredient_id,
                    name,
                    measurement_unit,
                    amount,
                });
        }

        rows.into_iter()
            .map(|row| {
                let author = authors
                    .get(&row.author_id)
                    .cloned()
                    .ok_or_else(|| Error::Storage(format!("dangling author {}", row.author_id)))?;
                Ok(Recipe {
                    id: row.id,
                    author,
                    name: row.name,
                    text: row.text,
                    cooking_time: row.cooking_time,
                    tags: tags_by_recipe.remove(&row.id).unwrap_or_default(),
                    ingredients: ingredients_by_recipe.remove(&row.id).unwrap_or_default(),
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}

fn insert_recipe_children(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    recipe: &ValidRecipe,
) -> QueryResult<()> {
    let tag_rows: Vec<models::NewRecipeTag> = recipe
        .tag_ids
        .iter()
        .map(|&tag_id| models::NewRecipeTag { recipe_id, tag_id })
        .collect();
    diesel::insert_into(recipe_tags::table)
        .values(&tag_rows)
        .execute(conn)?;

    let ingredient_rows: Vec<models::NewRecipeIngredient> = recipe
        .ingredients
        .iter()
        .map(|item| models::NewRecipeIngredient {
            recipe_id,
            ingredient_id: item.ingredient_id,
            amount: item.amount,
        })
        .collect();
    diesel::insert_into(recipe_ingredients::table)
        .values(&ingredient_rows)
        .execute(conn)?;

    Ok(())
}

fn recipe_fields(recipe: &ValidRecipe) -> models::RecipeFields<'_> {
    models::RecipeFields {
        name: &recipe.name,
        text: &recipe.text,
        cooking_time: recipe.cooking_time,
        image_content_type: &recipe.image.content_type,
        image_data: &recipe.image.data,
    }
}

impl Store for PgStore<'_> {
    fn user(&mut self, id: Uuid) -> Result<Option<User>> {
        db_query("user", || {
            users::table
                .find(id)
                .select(models::User::as_select())
                .first(self.conn)
                .optional()
        })
        .map(|u| u.map(User::from))
        .map_err(storage)
    }

    fn tags(&mut self) -> Result<Vec<Tag>> {
        db_query("tags", || {
            tags::table
                .order(tags::name.asc())
                .select(models::Tag::as_select())
                .load(self.conn)
        })
        .map(|rows| rows.into_iter().map(Tag::from).collect())
        .map_err(storage)
    }

    fn tag(&mut self, id: Uuid) -> Result<Option<Tag>> {
        db_query("tag", || {
            tags::table
                .find(id)
                .select(models::Tag::as_select())
                .first(self.conn)
                .optional()
        })
        .map(|t| t.map(Tag::from))
        .map_err(storage)
    }

    fn insert_tag(&mut self, tag: &NewTag) -> Result<Option<Tag>> {
        db_query("insert_tag", || {
            diesel::insert_into(tags::table)
                .values(models::NewTag {
                    name: &tag.name,
                    color: &tag.color,
                    slug: &tag.slug,
                })
                .on_conflict_do_nothing()
                .returning(models::Tag::as_returning())
                .get_result(self.conn)
                .optional()
        })
        .map(|t| t.map(Tag::from))
        .map_err(storage)
    }

    fn ingredients(&mut self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>> {
        db_query("ingredients", || {
            ingredient_search(name_prefix)
                .select(models::Ingredient::as_select())
                .load(self.conn)
        })
        .map(|rows| rows.into_iter().map(Ingredient::from).collect())
        .map_err(storage)
    }

    fn ingredient(&mut self, id: Uuid) -> Result<Option<Ingredient>> {
        db_query("ingredient", || {
            ingredients::table
                .find(id)
                .select(models::Ingredient::as_select())
                .first(self.conn)
                .optional()
        })
        .map(|i| i.map(Ingredient::from))
        .map_err(storage)
    }

    fn insert_ingredients(&mut self, items: &[NewIngredient]) -> Result<usize> {
        db_query("insert_ingredients", || {
            self.conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let mut inserted = 0;
                for chunk in items.chunks(INSERT_CHUNK) {
                    let rows: Vec<models::NewIngredient> = chunk
                        .iter()
                        .map(|i| models::NewIngredient {
                            name: &i.name,
                            measurement_unit: &i.measurement_unit,
                        })
                        .collect();
                    inserted += diesel::insert_into(ingredients::table)
                        .values(&rows)
                        .on_conflict_do_nothing()
                        .execute(conn)?;
                }
                Ok(inserted)
            })
        })
        .map_err(storage)
    }

    fn missing_tags(&mut self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let found: HashSet<Uuid> = db_query("existing_tags", || {
            tags::table
                .filter(tags::id.eq_any(ids))
                .select(tags::id)
                .load::<Uuid>(self.conn)
        })
        .map_err(storage)?
        .into_iter()
        .collect();
        Ok(ids.iter().filter(|id| !found.contains(id)).copied().collect())
    }

    fn missing_ingredients(&mut self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let found: HashSet<Uuid> = db_query("existing_ingredients", || {
            ingredients::table
                .filter(ingredients::id.eq_any(ids))
                .select(ingredients::id)
                .load::<Uuid>(self.conn)
        })
        .map_err(storage)?
        .into_iter()
        .collect();
        Ok(ids.iter().filter(|id| !found.contains(id)).copied().collect())
    }

    fn recipe(&mut self, id: Uuid) -> Result<Option<Recipe>> {
        let row = db_query("recipe", || {
            recipes::table
                .find(id)
                .select(models::Recipe::as_select())
                .first(self.conn)
                .optional()
        })
        .map_err(storage)?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row])?.pop()),
            None => Ok(None),
        }
    }

    fn recipe_image(&mut self, id: Uuid) -> Result<Option<RecipeImage>> {
        db_query("recipe_image", || {
            recipes::table
                .find(id)
                .select(models::RecipeImage::as_select())
                .first(self.conn)
                .optional()
        })
        .map(|image| {
            image.map(|i| RecipeImage {
                content_type: i.image_content_type,
                data: i.image_data,
            })
        })
        .map_err(storage)
    }

    fn find_recipes(
        &mut self,
        filter: &RecipeFilter,
        viewer: Option<Uuid>,
        page: Page,
    ) -> Result<Paginated<Recipe>> {
        let membership_viewer = filter.membership_viewer(viewer);

        let total: i64 = db_query("count_recipes", || {
            filtered_recipes(filter, membership_viewer)
                .count()
                .get_result(self.conn)
        })
        .map_err(storage)?;

        let rows: Vec<models::Recipe> = db_query("find_recipes", || {
            filtered_recipes(filter, membership_viewer)
                .order((recipes::created_at.desc(), recipes::id.desc()))
                .limit(page.limit as i64)
                .offset(page.offset())
                .select(models::Recipe::as_select())
                .load(self.conn)
        })
        .map_err(storage)?;

        Ok(Paginated {
            items: self.hydrate(rows)?,
            total,
            page,
        })
    }

    fn insert_recipe(&mut self, author: Uuid, recipe: &ValidRecipe) -> Result<Uuid> {
        db_query("insert_recipe", || {
            self.conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let id: Uuid = diesel::insert_into(recipes::table)
                    .values(models::NewRecipe {
                        author_id: author,
                        fields: recipe_fields(recipe),
                    })
                    .returning(recipes::id)
                    .get_result(conn)?;
                insert_recipe_children(conn, id, recipe)?;
                Ok(id)
            })
        })
        .map_err(storage)
    }

    fn replace_recipe(&mut self, id: Uuid, recipe: &ValidRecipe) -> Result<()> {
        db_query("replace_recipe", || {
            self.conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let updated = diesel::update(recipes::table.find(id))
                    .set(recipe_fields(recipe))
                    .execute(conn)?;
                if updated == 0 {
                    return Err(diesel::result::Error::NotFound);
                }

                diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(id)))
                    .execute(conn)?;
                diesel::delete(
                    recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(id)),
                )
                .execute(conn)?;
                insert_recipe_children(conn, id, recipe)
            })
        })
        .map_err(|e| match e {
            diesel::result::Error::NotFound => Error::not_found("Recipe"),
            other => storage(other),
        })
    }

    fn delete_recipe(&mut self, id: Uuid) -> Result<bool> {
        db_query("delete_recipe", || {
            diesel::delete(recipes::table.find(id)).execute(self.conn)
        })
        .map(|n| n > 0)
        .map_err(storage)
    }

    fn insert_relation(&mut self, relation: Relation, user: Uuid, recipe: Uuid) -> Result<bool> {
        db_query("insert_relation", || match relation {
            Relation::Favorite => diesel::insert_into(favorites::table)
                .values((favorites::user_id.eq(user), favorites::recipe_id.eq(recipe)))
                .on_conflict_do_nothing()
                .execute(self.conn),
            Relation::ShoppingCart => diesel::insert_into(shopping_cart_items::table)
                .values((
                    shopping_cart_items::user_id.eq(user),
                    shopping_cart_items::recipe_id.eq(recipe),
                ))
                .on_conflict_do_nothing()
                .execute(self.conn),
        })
        .map(|n| n > 0)
        .map_err(missing_parent("Recipe"))
    }

    fn delete_relation(&mut self, relation: Relation, user: Uuid, recipe: Uuid) -> Result<bool> {
        db_query("delete_relation", || match relation {
            Relation::Favorite => diesel::delete(
                favorites::table
                    .filter(favorites::user_id.eq(user))
                    .filter(favorites::recipe_id.eq(recipe)),
            )
            .execute(self.conn),
            Relation::ShoppingCart => diesel::delete(
                shopping_cart_items::table
                    .filter(shopping_cart_items::user_id.eq(user))
                    .filter(shopping_cart_items::recipe_id.eq(recipe)),
            )
            .execute(self.conn),
        })
        .map(|n| n > 0)
        .map_err(storage)
    }

    fn related_recipe_ids(
        &mut self,
        relation: Relation,
        user: Uuid,
        recipes: &[Uuid],
    ) -> Result<HashSet<Uuid>> {
        if recipes.is_empty() {
            return Ok(HashSet::new());
        }

        db_query("related_recipe_ids", || match relation {
            Relation::Favorite => favorites::table
                .filter(favorites::user_id.eq(user))
                .filter(favorites::recipe_id.eq_any(recipes))
                .select(favorites::recipe_id)
                .load::<Uuid>(self.conn),
            Relation::ShoppingCart => shopping_cart_items::table
                .filter(shopping_cart_items::user_id.eq(user))
                .filter(shopping_cart_items::recipe_id.eq_any(recipes))
                .select(shopping_cart_items::recipe_id)
                .load::<Uuid>(self.conn),
        })
        .map(|ids| ids.into_iter().collect())
        .map_err(storage)
    }

    fn cart_recipe_ids(&mut self, user: Uuid) -> Result<Vec<Uuid>> {
        db_query("cart_recipe_ids", || {
            shopping_cart_items::table
                .filter(shopping_cart_items::user_id.eq(user))
                .select(shopping_cart_items::recipe_id)
                .load(self.conn)
        })
        .map_err(storage)
    }

    fn ingredient_rows(&mut self, recipes: &[Uuid]) -> Result<Vec<IngredientRow>> {
        if recipes.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, String, i32)> = db_query("ingredient_rows", || {
            recipe_ingredients::table
                .inner_join(ingredients::table)
                .filter(recipe_ingredients::recipe_id.eq_any(recipes))
                .select((
                    ingredients::name,
                    ingredients::measurement_unit,
                    recipe_ingredients::amount,
                ))
                .load(self.conn)
        })
        .map_err(storage)?;

        Ok(rows
            .into_iter()
            .map(|(name, measurement_unit, amount)| IngredientRow {
                name,
                measurement_unit,
                amount,
            })
            .collect())
    }

    fn insert_subscription(&mut self, follower: Uuid, author: Uuid) -> Result<bool> {
        db_query("insert_subscription", || {
            diesel::insert_into(subscriptions::table)
                .values((
                    subscriptions::follower_id.eq(follower),
                    subscriptions::author_id.eq(author),
                ))
                .on_conflict_do_nothing()
                .execute(self.conn)
        })
        .map(|n| n > 0)
        .map_err(missing_parent("Author"))
    }

    fn delete_subscription(&mut self, follower: Uuid, author: Uuid) -> Result<bool> {
        db_query("delete_subscription", || {
            diesel::delete(
                subscriptions::table
                    .filter(subscriptions::follower_id.eq(follower))
                    .filter(subscriptions::author_id.eq(author)),
            )
            .execute(self.conn)
        })
        .map(|n| n > 0)
        .map_err(storage)
    }

    fn followed_author_ids(
        &mut self,
        follower: Uuid,
        authors: &[Uuid],
    ) -> Result<HashSet<Uuid>> {
        if authors.is_empty() {
            return Ok(HashSet::new());
        }

        db_query("followed_author_ids", || {
            subscriptions::table
                .filter(subscriptions::follower_id.eq(follower))
                .filter(subscriptions::author_id.eq_any(authors))
                .select(subscriptions::author_id)
                .load::<Uuid>(self.conn)
        })
        .map(|ids| ids.into_iter().collect())
        .map_err(storage)
    }

    fn subscriptions(&mut self, follower: Uuid, page: Page) -> Result<Paginated<User>> {
        let followed = || {
            subscriptions::table
                .filter(subscriptions::follower_id.eq(follower))
                .select(subscriptions::author_id)
        };

        let total: i64 = db_query("count_subscriptions", || {
            subscriptions::table
                .filter(subscriptions::follower_id.eq(follower))
                .count()
                .get_result(self.conn)
        })
        .map_err(storage)?;

        let authors: Vec<models::User> = db_query("subscriptions", || {
            users::table
                .filter(users::id.eq_any(followed()))
                .order(users::username.asc())
                .limit(page.limit as i64)
                .offset(page.offset())
                .select(models::User::as_select())
                .load(self.conn)
        })
        .map_err(storage)?;

        Ok(Paginated {
            items: authors.into_iter().map(User::from).collect(),
            total,
            page,
        })
    }
}
