//! Recipe list filtering.
//!
//! Three independent filters compose with AND:
//! - tag filter: a recipe matches if ANY of its tag slugs is requested (OR logic);
//!   an empty request applies no tag filtering
//! - author scope: only recipes by one author
//! - membership scope: only recipes in the viewer's favorites and/or shopping cart
//!
//! Results are always ordered newest first (creation time, then id) before paging.

use std::cmp::Ordering;
use std::collections::HashSet;

use uuid::Uuid;

use crate::types::Recipe;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Requested tag slugs
    pub tags: Vec<String>,
    pub author: Option<Uuid>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// The viewer's relation sets, needed to evaluate the membership scope.
#[derive(Debug, Clone, Default)]
pub struct Membership {
    pub favorites: HashSet<Uuid>,
    pub shopping_cart: HashSet<Uuid>,
}

impl RecipeFilter {
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn by_author(mut self, author: Uuid) -> Self {
        self.author = Some(author);
        self
    }

    pub fn favorited(mut self) -> Self {
        self.is_favorited = true;
        self
    }

    pub fn in_shopping_cart(mut self) -> Self {
        self.is_in_shopping_cart = true;
        self
    }

    /// Membership flags only apply to a known viewer; anonymous requests ignore them.
    pub fn membership_viewer(&self, viewer: Option<Uuid>) -> Option<Uuid> {
        if self.is_favorited || self.is_in_shopping_cart {
            viewer
        } else {
            None
        }
    }

    pub fn matches_tags<'a, I>(&self, slugs: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.tags.is_empty() {
            return true;
        }
        slugs
            .into_iter()
            .any(|slug| self.tags.iter().any(|t| t == slug))
    }

    /// Evaluate all three filters against one recipe. `membership` is `None`
    /// when the membership scope does not apply (anonymous viewer).
    pub fn matches(&self, recipe: &Recipe, membership: Option<&Membership>) -> bool {
        if !self.matches_tags(recipe.tags.iter().map(|t| t.slug.as_str())) {
            return false;
        }

        if let Some(author) = self.author {
            if recipe.author.id != author {
                return false;
            }
        }

        if let Some(sets) = membership {
            if self.is_favorited && !sets.favorites.contains(&recipe.id) {
                return false;
            }
            if self.is_in_shopping_cart && !sets.shopping_cart.contains(&recipe.id) {
                return false;
            }
        }

        true
    }
}

/// Newest first; identical timestamps fall back to descending id so the order is reproducible.
pub fn newest_first(a: &Recipe, b: &Recipe) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

pub fn sort_newest_first(recipes: &mut [Recipe]) {
    recipes.sort_by(newest_first);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Tag, User};
    use chrono::{TimeZone, Utc};

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            is_admin: false,
        }
    }

    fn tag(slug: &str) -> Tag {
        Tag {
            id: Uuid::new_v4(),
            name: slug.to_string(),
            color: "#49B64E".to_string(),
            slug: slug.to_string(),
        }
    }

    fn recipe(author: &User, slugs: &[&str], minute: u32) -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            author: author.clone(),
            name: "Recipe".to_string(),
            text: "Text".to_string(),
            cooking_time: 10,
            tags: slugs.iter().map(|s| tag(s)).collect(),
            ingredients: vec![],
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_no_tags_matches_everything() {
        let r = recipe(&user(), &[], 0);
        assert!(RecipeFilter::default().matches(&r, None));
    }

    #[test]
    fn test_tags_are_or() {
        let filter = RecipeFilter::default().with_tags(["breakfast", "dinner"]);
        let author = user();
        assert!(filter.matches(&recipe(&author, &["breakfast"], 0), None));
        assert!(filter.matches(&recipe(&author, &["dinner", "lunch"], 0), None));
        assert!(!filter.matches(&recipe(&author, &["lunch"], 0), None));
        assert!(!filter.matches(&recipe(&author, &[], 0), None));
    }

    #[test]
    fn test_unknown_tag_matches_nothing() {
        let filter = RecipeFilter::default().with_tags(["no-such-tag"]);
        assert!(!filter.matches(&recipe(&user(), &["breakfast"], 0), None));
    }

    #[test]
    fn test_author_and_tags_compose() {
        let alice = user();
        let bob = user();
        let filter = RecipeFilter::default()
            .with_tags(["dinner"])
            .by_author(alice.id);
        assert!(filter.matches(&recipe(&alice, &["dinner"], 0), None));
        assert!(!filter.matches(&recipe(&bob, &["dinner"], 0), None));
        assert!(!filter.matches(&recipe(&alice, &["lunch"], 0), None));
    }

    #[test]
    fn test_membership_scope() {
        let author = user();
        let liked = recipe(&author, &["dinner"], 0);
        let other = recipe(&author, &["dinner"], 1);
        let membership = Membership {
            favorites: [liked.id].into_iter().collect(),
            shopping_cart: HashSet::new(),
        };

        let filter = RecipeFilter::default().favorited();
        assert!(filter.matches(&liked, Some(&membership)));
        assert!(!filter.matches(&other, Some(&membership)));

        let both = RecipeFilter::default().favorited().in_shopping_cart();
        assert!(!both.matches(&liked, Some(&membership)));
    }

    #[test]
    fn test_membership_ignored_for_anonymous() {
        let filter = RecipeFilter::default().favorited();
        assert_eq!(filter.membership_viewer(None), None);
        assert!(filter.matches(&recipe(&user(), &[], 0), None));

        let viewer = Uuid::new_v4();
        assert_eq!(filter.membership_viewer(Some(viewer)), Some(viewer));
        assert_eq!(RecipeFilter::default().membership_viewer(Some(viewer)), None);
    }

    #[test]
    fn test_sort_newest_first_with_tie_break() {
        let author = user();
        let old = recipe(&author, &[], 0);
        let mut tied_a = recipe(&author, &[], 30);
        let mut tied_b = recipe(&author, &[], 30);
        if tied_a.id < tied_b.id {
            std::mem::swap(&mut tied_a, &mut tied_b);
        }

        let mut recipes = vec![old.clone(), tied_b.clone(), tied_a.clone()];
        sort_newest_first(&mut recipes);
        let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![tied_a.id, tied_b.id, old.id]);
    }
}
