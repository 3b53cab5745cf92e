//! In-memory [`Store`] for tests.
//!
//! Behaves like the PostgreSQL store: uniqueness of join rows, cascading
//! recipe deletes, and newest-first ordering. Creation timestamps come from a
//! fake clock that advances one second per recipe, so ordering is deterministic.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::filter::{sort_newest_first, Membership, RecipeFilter};
use crate::store::Store;
use crate::types::{
    Ingredient, IngredientAmount, IngredientRow, NewIngredient, NewTag, Page, Paginated, Recipe,
    RecipeImage, RecipeIngredient, Relation, Tag, User, ValidRecipe,
};

#[derive(Debug, Clone)]
struct StoredRecipe {
    id: Uuid,
    author: Uuid,
    name: String,
    text: String,
    cooking_time: i32,
    image: RecipeImage,
    tag_ids: Vec<Uuid>,
    ingredients: Vec<IngredientAmount>,
    created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct MemoryStore {
    users: HashMap<Uuid, User>,
    tags: HashMap<Uuid, Tag>,
    ingredients: HashMap<Uuid, Ingredient>,
    recipes: HashMap<Uuid, StoredRecipe>,
    favorites: BTreeSet<(Uuid, Uuid)>,
    shopping_cart: BTreeSet<(Uuid, Uuid)>,
    subscriptions: BTreeSet<(Uuid, Uuid)>,
    clock: DateTime<Utc>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            users: HashMap::new(),
            tags: HashMap::new(),
            ingredients: HashMap::new(),
            recipes: HashMap::new(),
            favorites: BTreeSet::new(),
            shopping_cart: BTreeSet::new(),
            subscriptions: BTreeSet::new(),
            // 2024-01-01T00:00:00Z
            clock: DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", username),
            username: username.to_string(),
            first_name: username.to_string(),
            last_name: String::new(),
            is_admin: false,
        };
        self.users.insert(user.id, user.clone());
        user
    }

    pub fn add_admin(&mut self, username: &str) -> User {
        let mut user = self.add_user(username);
        user.is_admin = true;
        self.users.insert(user.id, user.clone());
        user
    }

    /// Add a tag directly, bypassing validation. Panics on duplicates.
    pub fn add_tag(&mut self, name: &str, slug: &str) -> Tag {
        let color = format!("#{:06X}", self.tags.len());
        self.insert_tag(&NewTag {
            name: name.to_string(),
            color,
            slug: slug.to_string(),
        })
        .expect("memory store never fails")
        .expect("tag already exists")
    }

    /// Add an ingredient directly. Panics on duplicates.
    pub fn add_ingredient(&mut self, name: &str, unit: &str) -> Ingredient {
        let ingredient = Ingredient {
            id: Uuid::new_v4(),
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        };
        assert!(
            !self.has_ingredient(name, unit),
            "ingredient already exists"
        );
        self.ingredients.insert(ingredient.id, ingredient.clone());
        ingredient
    }

    /// Pin a recipe's creation time, e.g. to produce timestamp ties.
    pub fn set_created_at(&mut self, recipe: Uuid, at: DateTime<Utc>) {
        if let Some(stored) = self.recipes.get_mut(&recipe) {
            stored.created_at = at;
        }
    }

    pub fn ingredient_count(&self) -> usize {
        self.ingredients.len()
    }

    fn has_ingredient(&self, name: &str, unit: &str) -> bool {
        self.ingredients
            .values()
            .any(|i| i.name == name && i.measurement_unit == unit)
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += Duration::seconds(1);
        self.clock
    }

    fn relation_set(&mut self, relation: Relation) -> &mut BTreeSet<(Uuid, Uuid)> {
        match relation {
            Relation::Favorite => &mut self.favorites,
            Relation::ShoppingCart => &mut self.shopping_cart,
        }
    }

    fn hydrate(&self, stored: &StoredRecipe) -> Result<Recipe> {
        let author = self
            .users
            .get(&stored.author)
            .cloned()
            .ok_or_else(|| Error::Storage(format!("dangling author {}", stored.author)))?;

        let tags = stored
            .tag_ids
            .iter()
            .filter_map(|id| self.tags.get(id).cloned())
            .collect();

        let ingredients = stored
            .ingredients
            .iter()
            .filter_map(|item| {
                self.ingredients
                    .get(&item.ingredient_id)
                    .map(|ingredient| RecipeIngredient {
                        ingredient_id: ingredient.id,
                        name: ingredient.name.clone(),
                        measurement_unit: ingredient.measurement_unit.clone(),
                        amount: item.amount,
                    })
            })
            .collect();

        Ok(Recipe {
            id: stored.id,
            author,
            name: stored.name.clone(),
            text: stored.text.clone(),
            cooking_time: stored.cooking_time,
            tags,
            ingredients,
            created_at: stored.created_at,
        })
    }

    fn membership(&self, user: Uuid) -> Membership {
        Membership {
            favorites: self
                .favorites
                .iter()
                .filter(|(u, _)| *u == user)
                .map(|(_, r)| *r)
                .collect(),
            shopping_cart: self
                .shopping_cart
                .iter()
                .filter(|(u, _)| *u == user)
                .map(|(_, r)| *r)
                .collect(),
        }
    }
}

impl Store for MemoryStore {
    fn user(&mut self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).cloned())
    }

    fn tags(&mut self) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = self.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    fn tag(&mut self, id: Uuid) -> Result<Option<Tag>> {
        Ok(self.tags.get(&id).cloned())
    }

    fn insert_tag(&mut self, tag: &NewTag) -> Result<Option<Tag>> {
        let taken = self
            .tags
            .values()
            .any(|t| t.name == tag.name || t.color == tag.color || t.slug == tag.slug);
        if taken {
            return Ok(None);
        }

        let created = Tag {
            id: Uuid::new_v4(),
            name: tag.name.clone(),
            color: tag.color.clone(),
            slug: tag.slug.clone(),
        };
        self.tags.insert(created.id, created.clone());
        Ok(Some(created))
    }

    fn ingredients(&mut self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>> {
        let prefix = name_prefix.map(str::to_lowercase);
        let mut found: Vec<Ingredient> = self
            .ingredients
            .values()
            .filter(|i| match &prefix {
                Some(p) => i.name.to_lowercase().starts_with(p.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
        });
        Ok(found)
    }

    fn ingredient(&mut self, id: Uuid) -> Result<Option<Ingredient>> {
        Ok(self.ingredients.get(&id).cloned())
    }

    fn insert_ingredients(&mut self, items: &[NewIngredient]) -> Result<usize> {
        let mut inserted = 0;
        for item in items {
            if self.has_ingredient(&item.name, &item.measurement_unit) {
                continue;
            }
            let ingredient = Ingredient {
                id: Uuid::new_v4(),
                name: item.name.clone(),
                measurement_unit: item.measurement_unit.clone(),
            };
            self.ingredients.insert(ingredient.id, ingredient);
            inserted += 1;
        }
        Ok(inserted)
    }

    fn missing_tags(&mut self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        Ok(ids
            .iter()
            .filter(|id| !self.tags.contains_key(id))
            .copied()
            .collect())
    }

    fn missing_ingredients(&mut self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        Ok(ids
            .iter()
            .filter(|id| !self.ingredients.contains_key(id))
            .copied()
            .collect())
    }

    fn recipe(&mut self, id: Uuid) -> Result<Option<Recipe>> {
        self.recipes
            .get(&id)
            .map(|stored| self.hydrate(stored))
            .transpose()
    }

    fn recipe_image(&mut self, id: Uuid) -> Result<Option<RecipeImage>> {
        Ok(self.recipes.get(&id).map(|r| r.image.clone()))
    }

    fn find_recipes(
        &mut self,
        filter: &RecipeFilter,
        viewer: Option<Uuid>,
        page: Page,
    ) -> Result<Paginated<Recipe>> {
        let membership = filter
            .membership_viewer(viewer)
            .map(|user| self.membership(user));

        let mut matching = Vec::new();
        for stored in self.recipes.values() {
            let recipe = self.hydrate(stored)?;
            if filter.matches(&recipe, membership.as_ref()) {
                matching.push(recipe);
            }
        }

        sort_newest_first(&mut matching);
        Ok(page.slice(matching))
    }

    fn insert_recipe(&mut self, author: Uuid, recipe: &ValidRecipe) -> Result<Uuid> {
        if !self.users.contains_key(&author) {
            return Err(Error::Storage(format!("unknown author {}", author)));
        }

        let id = Uuid::new_v4();
        let created_at = self.tick();
        self.recipes.insert(
            id,
            StoredRecipe {
                id,
                author,
                name: recipe.name.clone(),
                text: recipe.text.clone(),
                cooking_time: recipe.cooking_time,
                image: recipe.image.clone(),
                tag_ids: recipe.tag_ids.clone(),
                ingredients: recipe.ingredients.clone(),
                created_at,
            },
        );
        Ok(id)
    }

    fn replace_recipe(&mut self, id: Uuid, recipe: &ValidRecipe) -> Result<()> {
        let stored = self
            .recipes
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Recipe"))?;

        stored.name = recipe.name.clone();
        stored.text = recipe.text.clone();
        stored.cooking_time = recipe.cooking_time;
        stored.image = recipe.image.clone();
        stored.tag_ids = recipe.tag_ids.clone();
        stored.ingredients = recipe.ingredients.clone();
        Ok(())
    }

    fn delete_recipe(&mut self, id: Uuid) -> Result<bool> {
        if self.recipes.remove(&id).is_none() {
            return Ok(false);
        }
        self.favorites.retain(|(_, r)| *r != id);
        self.shopping_cart.retain(|(_, r)| *r != id);
        Ok(true)
    }

    fn insert_relation(&mut self, relation: Relation, user: Uuid, recipe: Uuid) -> Result<bool> {
        Ok(self.relation_set(relation).insert((user, recipe)))
    }

    fn delete_relation(&mut self, relation: Relation, user: Uuid, recipe: Uuid) -> Result<bool> {
        Ok(self.relation_set(relation).remove(&(user, recipe)))
    }

    fn related_recipe_ids(
        &mut self,
        relation: Relation,
        user: Uuid,
        recipes: &[Uuid],
    ) -> Result<HashSet<Uuid>> {
        let set = self.relation_set(relation);
        Ok(recipes
            .iter()
            .filter(|r| set.contains(&(user, **r)))
            .copied()
            .collect())
    }

    fn cart_recipe_ids(&mut self, user: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .shopping_cart
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, r)| *r)
            .collect())
    }

    fn ingredient_rows(&mut self, recipes: &[Uuid]) -> Result<Vec<IngredientRow>> {
        let mut rows = Vec::new();
        for id in recipes {
            let Some(stored) = self.recipes.get(id) else {
                continue;
            };
            for item in &stored.ingredients {
                let ingredient = self.ingredients.get(&item.ingredient_id).ok_or_else(|| {
                    Error::Storage(format!("dangling ingredient {}", item.ingredient_id))
                })?;
                rows.push(IngredientRow {
                    name: ingredient.name.clone(),
                    measurement_unit: ingredient.measurement_unit.clone(),
                    amount: item.amount,
                });
            }
        }
        Ok(rows)
    }

    fn insert_subscription(&mut self, follower: Uuid, author: Uuid) -> Result<bool> {
        if follower == author {
            return Err(Error::Storage("self-subscription violates check".to_string()));
        }
        Ok(self.subscriptions.insert((follower, author)))
    }

    fn delete_subscription(&mut self, follower: Uuid, author: Uuid) -> Result<bool> {
        Ok(self.subscriptions.remove(&(follower, author)))
    }

    fn followed_author_ids(
        &mut self,
        follower: Uuid,
        authors: &[Uuid],
    ) -> Result<HashSet<Uuid>> {
        Ok(authors
            .iter()
            .filter(|a| self.subscriptions.contains(&(follower, **a)))
            .copied()
            .collect())
    }

    fn subscriptions(&mut self, follower: Uuid, page: Page) -> Result<Paginated<User>> {
        let mut authors: Vec<User> = self
            .subscriptions
            .iter()
            .filter(|(f, _)| *f == follower)
            .filter_map(|(_, a)| self.users.get(a).cloned())
            .collect();
        authors.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(page.slice(authors))
    }
}
