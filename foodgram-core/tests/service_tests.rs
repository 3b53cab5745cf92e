//! End-to-end service behaviour against the in-memory store.

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use foodgram_core::shopping_list::{self, render_line};
use foodgram_core::{
    recipes, relations, subscriptions, Error, Ingredient, IngredientAmount, MemoryStore, Page,
    RecipeDraft, RecipeFilter, Relation, Store, Tag, User,
};
use uuid::Uuid;

/// 1x1 transparent PNG
const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

struct Fixture {
    store: MemoryStore,
    author: User,
    reader: User,
    breakfast: Tag,
    dinner: Tag,
    lunch: Tag,
}

impl Fixture {
    fn new() -> Self {
        let mut store = MemoryStore::new();
        let author = store.add_user("author");
        let reader = store.add_user("reader");
        let breakfast = store.add_tag("Завтрак", "breakfast");
        let dinner = store.add_tag("Ужин", "dinner");
        let lunch = store.add_tag("Обед", "lunch");
        Self {
            store,
            author,
            reader,
            breakfast,
            dinner,
            lunch,
        }
    }

    fn recipe(&mut self, name: &str, tags: &[&Tag], items: &[(&Ingredient, i32)]) -> Uuid {
        let author = self.author.clone();
        self.recipe_by(&author, name, tags, items)
    }

    fn recipe_by(
        &mut self,
        author: &User,
        name: &str,
        tags: &[&Tag],
        items: &[(&Ingredient, i32)],
    ) -> Uuid {
        let view = recipes::create(&mut self.store, author, draft(name, tags, items))
            .expect("create recipe");
        view.recipe.id
    }
}

fn draft(name: &str, tags: &[&Tag], items: &[(&Ingredient, i32)]) -> RecipeDraft {
    RecipeDraft {
        name: name.to_string(),
        text: "Смешать и подать".to_string(),
        cooking_time: 15,
        image: PNG_URI.to_string(),
        tags: tags.iter().map(|t| t.id).collect(),
        ingredients: items
            .iter()
            .map(|(ingredient, amount)| IngredientAmount {
                ingredient_id: ingredient.id,
                amount: *amount,
            })
            .collect(),
    }
}

fn ids(filter: &RecipeFilter, store: &mut MemoryStore, viewer: Option<Uuid>) -> Vec<Uuid> {
    recipes::list(store, viewer, filter, Page::new(Some(1), Some(100)))
        .unwrap()
        .items
        .into_iter()
        .map(|v| v.recipe.id)
        .collect()
}

#[test]
fn empty_cart_yields_empty_shopping_list() {
    let mut fx = Fixture::new();
    let list = shopping_list::build(&mut fx.store, fx.reader.id).unwrap();
    assert!(list.is_empty());
}

#[test]
fn same_ingredient_is_summed_across_recipes() {
    let mut fx = Fixture::new();
    let sugar = fx.store.add_ingredient("Сахар", "г");
    let breakfast = fx.breakfast.clone();
    let a = fx.recipe("A", &[&breakfast], &[(&sugar, 5)]);
    let b = fx.recipe("B", &[&breakfast], &[(&sugar, 10)]);

    relations::add(&mut fx.store, Relation::ShoppingCart, fx.reader.id, a).unwrap();
    relations::add(&mut fx.store, Relation::ShoppingCart, fx.reader.id, b).unwrap();

    let list = shopping_list::build(&mut fx.store, fx.reader.id).unwrap();
    let lines: Vec<String> = list.entries.iter().map(render_line).collect();
    assert_eq!(lines, vec!["Сахар (г) — 15".to_string()]);
    assert!(list.render().contains("Сахар (г) — 15"));
}

#[test]
fn different_units_stay_separate() {
    let mut fx = Fixture::new();
    let flour_g = fx.store.add_ingredient("Мука", "г");
    let flour_ml = fx.store.add_ingredient("Мука", "мл");
    let dinner = fx.dinner.clone();
    let a = fx.recipe("A", &[&dinner], &[(&flour_g, 200)]);
    let b = fx.recipe("B", &[&dinner], &[(&flour_ml, 200)]);

    relations::add(&mut fx.store, Relation::ShoppingCart, fx.reader.id, a).unwrap();
    relations::add(&mut fx.store, Relation::ShoppingCart, fx.reader.id, b).unwrap();

    let list = shopping_list::build(&mut fx.store, fx.reader.id).unwrap();
    let triples: HashSet<(String, String, i64)> = list
        .entries
        .into_iter()
        .map(|e| (e.name, e.measurement_unit, e.total))
        .collect();
    let expected: HashSet<(String, String, i64)> = [
        ("Мука".to_string(), "г".to_string(), 200),
        ("Мука".to_string(), "мл".to_string(), 200),
    ]
    .into_iter()
    .collect();
    assert_eq!(triples, expected);
}

#[test]
fn totals_equal_sum_of_rows_for_cart_recipes_only() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let milk = fx.store.add_ingredient("Молоко", "мл");
    let salt = fx.store.add_ingredient("Соль", "г");
    let breakfast = fx.breakfast.clone();

    let omelette = fx.recipe("Омлет", &[&breakfast], &[(&egg, 3), (&milk, 50), (&salt, 2)]);
    let pancakes = fx.recipe("Блины", &[&breakfast], &[(&egg, 2), (&milk, 500)]);
    let _not_in_cart = fx.recipe("Яичница", &[&breakfast], &[(&egg, 4)]);

    for recipe in [omelette, pancakes] {
        relations::add(&mut fx.store, Relation::ShoppingCart, fx.reader.id, recipe).unwrap();
    }

    let list = shopping_list::build(&mut fx.store, fx.reader.id).unwrap();
    let total = |name: &str| {
        list.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.total)
            .unwrap()
    };
    assert_eq!(list.entries.len(), 3);
    assert_eq!(total("Яйцо"), 5);
    assert_eq!(total("Молоко"), 550);
    assert_eq!(total("Соль"), 2);
}

#[test]
fn building_the_list_does_not_touch_the_cart() {
    let mut fx = Fixture::new();
    let sugar = fx.store.add_ingredient("Сахар", "г");
    let breakfast = fx.breakfast.clone();
    let a = fx.recipe("A", &[&breakfast], &[(&sugar, 5)]);
    relations::add(&mut fx.store, Relation::ShoppingCart, fx.reader.id, a).unwrap();

    shopping_list::build(&mut fx.store, fx.reader.id).unwrap();
    shopping_list::build(&mut fx.store, fx.reader.id).unwrap();

    assert_eq!(fx.store.cart_recipe_ids(fx.reader.id).unwrap(), vec![a]);
}

#[test]
fn tag_filter_is_union_without_duplicates() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let (breakfast, dinner, lunch) = (fx.breakfast.clone(), fx.dinner.clone(), fx.lunch.clone());

    let only_breakfast = fx.recipe("1", &[&breakfast], &[(&egg, 1)]);
    let only_dinner = fx.recipe("2", &[&dinner], &[(&egg, 1)]);
    let both = fx.recipe("3", &[&breakfast, &dinner], &[(&egg, 1)]);
    let _only_lunch = fx.recipe("4", &[&lunch], &[(&egg, 1)]);

    let filter = RecipeFilter::default().with_tags(["breakfast", "dinner"]);
    let found = ids(&filter, &mut fx.store, None);

    assert_eq!(found.len(), 3);
    let found: HashSet<Uuid> = found.into_iter().collect();
    let expected: HashSet<Uuid> = [only_breakfast, only_dinner, both].into_iter().collect();
    assert_eq!(found, expected);
}

#[test]
fn unknown_tag_and_unknown_author_give_empty_results() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let breakfast = fx.breakfast.clone();
    fx.recipe("1", &[&breakfast], &[(&egg, 1)]);

    let unknown_tag = RecipeFilter::default().with_tags(["does-not-exist"]);
    assert!(ids(&unknown_tag, &mut fx.store, None).is_empty());

    let mixed = RecipeFilter::default().with_tags(["does-not-exist", "breakfast"]);
    assert_eq!(ids(&mixed, &mut fx.store, None).len(), 1);

    let unknown_author = RecipeFilter::default().by_author(Uuid::new_v4());
    assert!(ids(&unknown_author, &mut fx.store, None).is_empty());
}

#[test]
fn favorites_filtered_by_tags() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let (breakfast, dinner) = (fx.breakfast.clone(), fx.dinner.clone());

    let fav_breakfast = fx.recipe("1", &[&breakfast], &[(&egg, 1)]);
    let fav_dinner = fx.recipe("2", &[&dinner], &[(&egg, 1)]);
    let _plain_breakfast = fx.recipe("3", &[&breakfast], &[(&egg, 1)]);

    for recipe in [fav_breakfast, fav_dinner] {
        relations::add(&mut fx.store, Relation::Favorite, fx.reader.id, recipe).unwrap();
    }

    let filter = RecipeFilter::default()
        .favorited()
        .with_tags(["breakfast"]);
    assert_eq!(
        ids(&filter, &mut fx.store, Some(fx.reader.id)),
        vec![fav_breakfast]
    );

    // Anonymous viewers have no favorites to scope by.
    assert_eq!(ids(&filter, &mut fx.store, None).len(), 2);
}

#[test]
fn author_page_filtered_by_tags() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let other = fx.store.add_user("other");
    let dinner = fx.dinner.clone();
    let breakfast = fx.breakfast.clone();

    let mine = fx.recipe("1", &[&dinner], &[(&egg, 1)]);
    let _mine_breakfast = fx.recipe("2", &[&breakfast], &[(&egg, 1)]);
    let _theirs = fx.recipe_by(&other, "3", &[&dinner], &[(&egg, 1)]);

    let filter = RecipeFilter::default()
        .by_author(fx.author.id)
        .with_tags(["dinner"]);
    assert_eq!(ids(&filter, &mut fx.store, None), vec![mine]);
}

#[test]
fn home_page_returns_six_newest() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let breakfast = fx.breakfast.clone();

    let created: Vec<Uuid> = (0..9)
        .map(|i| fx.recipe(&format!("Recipe {}", i), &[&breakfast], &[(&egg, 1)]))
        .collect();

    let page = recipes::list(
        &mut fx.store,
        None,
        &RecipeFilter::default(),
        Page::default(),
    )
    .unwrap();

    assert_eq!(page.total, 9);
    assert_eq!(page.items.len(), 6);
    let got: Vec<Uuid> = page.items.iter().map(|v| v.recipe.id).collect();
    let expected: Vec<Uuid> = created.iter().rev().take(6).copied().collect();
    assert_eq!(got, expected);
    assert!(page.has_next());
}

#[test]
fn identical_timestamps_have_stable_order() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let breakfast = fx.breakfast.clone();
    let same = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

    for i in 0..4 {
        let id = fx.recipe(&format!("{}", i), &[&breakfast], &[(&egg, 1)]);
        fx.store.set_created_at(id, same);
    }

    let first = ids(&RecipeFilter::default(), &mut fx.store, None);
    let second = ids(&RecipeFilter::default(), &mut fx.store, None);
    assert_eq!(first, second);

    let mut sorted = first.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(first, sorted);
}

#[test]
fn favorite_toggle_semantics() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let breakfast = fx.breakfast.clone();
    let recipe = fx.recipe("Омлет", &[&breakfast], &[(&egg, 2)]);
    let user = fx.reader.id;

    let before = fx
        .store
        .related_recipe_ids(Relation::Favorite, user, &[recipe])
        .unwrap();

    let summary = relations::add(&mut fx.store, Relation::Favorite, user, recipe).unwrap();
    assert_eq!(summary.id, recipe);

    let second = relations::add(&mut fx.store, Relation::Favorite, user, recipe);
    assert!(matches!(second, Err(Error::Conflict(_))));

    relations::remove(&mut fx.store, Relation::Favorite, user, recipe).unwrap();
    let after = fx
        .store
        .related_recipe_ids(Relation::Favorite, user, &[recipe])
        .unwrap();
    assert_eq!(before, after);

    let missing = relations::remove(&mut fx.store, Relation::Favorite, user, recipe);
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

#[test]
fn relation_on_missing_recipe_is_not_found() {
    let mut fx = Fixture::new();
    let result = relations::add(
        &mut fx.store,
        Relation::ShoppingCart,
        fx.reader.id,
        Uuid::new_v4(),
    );
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn view_flags_follow_viewer() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let breakfast = fx.breakfast.clone();
    let recipe = fx.recipe("Омлет", &[&breakfast], &[(&egg, 2)]);

    relations::add(&mut fx.store, Relation::Favorite, fx.reader.id, recipe).unwrap();
    subscriptions::subscribe(&mut fx.store, fx.reader.id, fx.author.id).unwrap();

    let seen = recipes::get(&mut fx.store, Some(fx.reader.id), recipe).unwrap();
    assert!(seen.is_favorited);
    assert!(!seen.is_in_shopping_cart);
    assert!(seen.author_is_subscribed);

    let anonymous = recipes::get(&mut fx.store, None, recipe).unwrap();
    assert!(!anonymous.is_favorited);
    assert!(!anonymous.author_is_subscribed);
}

#[test]
fn empty_ingredient_list_is_rejected() {
    let mut fx = Fixture::new();
    let breakfast = fx.breakfast.clone();
    let author = fx.author.clone();
    let result = recipes::create(&mut fx.store, &author, draft("Пусто", &[&breakfast], &[]));
    assert!(matches!(result, Err(Error::Validation(_))));

    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let id = fx.recipe("Омлет", &[&breakfast], &[(&egg, 2)]);
    let result = recipes::update(
        &mut fx.store,
        &author,
        id,
        draft("Омлет", &[&breakfast], &[]),
    );
    assert!(matches!(result, Err(Error::Validation(_))));

    // The failed edit left the original ingredients in place.
    let stored = fx.store.recipe(id).unwrap().unwrap();
    assert_eq!(stored.ingredients.len(), 1);
}

#[test]
fn unknown_references_are_not_found() {
    let mut fx = Fixture::new();
    let author = fx.author.clone();
    let egg = fx.store.add_ingredient("Яйцо", "шт");

    let mut bad_tag = draft("Омлет", &[], &[(&egg, 1)]);
    bad_tag.tags = vec![Uuid::new_v4()];
    assert!(matches!(
        recipes::create(&mut fx.store, &author, bad_tag),
        Err(Error::NotFound(_))
    ));

    let breakfast = fx.breakfast.clone();
    let mut bad_ingredient = draft("Омлет", &[&breakfast], &[(&egg, 1)]);
    bad_ingredient.ingredients[0].ingredient_id = Uuid::new_v4();
    assert!(matches!(
        recipes::create(&mut fx.store, &author, bad_ingredient),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn update_replaces_ingredient_set() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let milk = fx.store.add_ingredient("Молоко", "мл");
    let (breakfast, dinner) = (fx.breakfast.clone(), fx.dinner.clone());
    let author = fx.author.clone();
    let id = fx.recipe("Омлет", &[&breakfast], &[(&egg, 2), (&milk, 50)]);

    let updated = recipes::update(
        &mut fx.store,
        &author,
        id,
        draft("Омлет на ужин", &[&dinner], &[(&egg, 4)]),
    )
    .unwrap();

    assert_eq!(updated.recipe.name, "Омлет на ужин");
    assert_eq!(updated.recipe.tags.len(), 1);
    assert_eq!(updated.recipe.tags[0].slug, "dinner");
    assert_eq!(updated.recipe.ingredients.len(), 1);
    assert_eq!(updated.recipe.ingredients[0].amount, 4);
}

#[test]
fn only_author_or_admin_may_modify() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let breakfast = fx.breakfast.clone();
    let id = fx.recipe("Омлет", &[&breakfast], &[(&egg, 2)]);
    let reader = fx.reader.clone();
    let admin = fx.store.add_admin("admin");

    let denied = recipes::update(
        &mut fx.store,
        &reader,
        id,
        draft("Чужой", &[&breakfast], &[(&egg, 1)]),
    );
    assert!(matches!(denied, Err(Error::Forbidden(_))));
    assert!(matches!(
        recipes::delete(&mut fx.store, &reader, id),
        Err(Error::Forbidden(_))
    ));

    recipes::update(
        &mut fx.store,
        &admin,
        id,
        draft("Админский", &[&breakfast], &[(&egg, 1)]),
    )
    .unwrap();
    recipes::delete(&mut fx.store, &admin, id).unwrap();
    assert!(matches!(
        recipes::get(&mut fx.store, None, id),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn deleting_a_recipe_removes_it_from_carts() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let breakfast = fx.breakfast.clone();
    let author = fx.author.clone();
    let id = fx.recipe("Омлет", &[&breakfast], &[(&egg, 2)]);

    relations::add(&mut fx.store, Relation::ShoppingCart, fx.reader.id, id).unwrap();
    recipes::delete(&mut fx.store, &author, id).unwrap();

    assert!(shopping_list::build(&mut fx.store, fx.reader.id)
        .unwrap()
        .is_empty());
}

#[test]
fn subscription_rules() {
    let mut fx = Fixture::new();
    let (reader, author) = (fx.reader.id, fx.author.id);

    assert!(matches!(
        subscriptions::subscribe(&mut fx.store, reader, reader),
        Err(Error::Conflict(_))
    ));
    assert!(matches!(
        subscriptions::subscribe(&mut fx.store, reader, Uuid::new_v4()),
        Err(Error::NotFound(_))
    ));

    subscriptions::subscribe(&mut fx.store, reader, author).unwrap();
    assert!(matches!(
        subscriptions::subscribe(&mut fx.store, reader, author),
        Err(Error::Conflict(_))
    ));

    subscriptions::unsubscribe(&mut fx.store, reader, author).unwrap();
    assert!(matches!(
        subscriptions::unsubscribe(&mut fx.store, reader, author),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn subscription_list_previews_recipes() {
    let mut fx = Fixture::new();
    let egg = fx.store.add_ingredient("Яйцо", "шт");
    let breakfast = fx.breakfast.clone();
    for i in 0..5 {
        fx.recipe(&format!("{}", i), &[&breakfast], &[(&egg, 1)]);
    }
    subscriptions::subscribe(&mut fx.store, fx.reader.id, fx.author.id).unwrap();

    let page = subscriptions::list(&mut fx.store, fx.reader.id, Page::default(), 2).unwrap();
    assert_eq!(page.total, 1);
    let view = &page.items[0];
    assert_eq!(view.user.id, fx.author.id);
    assert!(view.is_subscribed);
    assert_eq!(view.recipes_count, 5);
    assert_eq!(view.recipes.len(), 2);
    assert_eq!(view.recipes[0].name, "4");

    let counts_only = subscriptions::list(&mut fx.store, fx.reader.id, Page::default(), 0).unwrap();
    assert!(counts_only.items[0].recipes.is_empty());
    assert_eq!(counts_only.items[0].recipes_count, 5);
}

#[test]
fn ingredient_import_skips_existing() {
    let mut store = MemoryStore::new();
    store.add_ingredient("мука", "г");

    let items = foodgram_core::parse_ingredients(
        foodgram_core::ImportFormat::Csv,
        "мука,г\nмука,г\nсахар,г\nмолоко,мл\n",
    )
    .unwrap();
    let inserted = foodgram_core::import_ingredients(&mut store, &items).unwrap();

    assert_eq!(inserted, 2);
    assert_eq!(store.ingredient_count(), 3);

    let found = store.ingredients(Some("МО")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "молоко");
}
