use uuid::Uuid;

use crate::error::{Error, Result};
use crate::filter::RecipeFilter;
use crate::store::Store;
use crate::types::{AuthorView, Page, Paginated, User};

/// Number of recipes previewed per author when `recipes_limit` is not given.
pub const DEFAULT_RECIPES_LIMIT: u32 = 3;

pub fn subscribe<S: Store>(store: &mut S, follower: Uuid, author_id: Uuid) -> Result<AuthorView> {
    let author = store
        .user(author_id)?
        .ok_or_else(|| Error::not_found("Author"))?;

    if follower == author_id {
        return Err(Error::Conflict("Cannot subscribe to yourself".to_string()));
    }

    if !store.insert_subscription(follower, author_id)? {
        return Err(Error::Conflict(
            "Already subscribed to this author".to_string(),
        ));
    }

    tracing::info!(follower_id = %follower, author_id = %author_id, "subscribed");
    author_view(store, author, DEFAULT_RECIPES_LIMIT)
}

pub fn unsubscribe<S: Store>(store: &mut S, follower: Uuid, author_id: Uuid) -> Result<()> {
    if !store.delete_subscription(follower, author_id)? {
        return Err(Error::not_found("Subscription"));
    }

    tracing::info!(follower_id = %follower, author_id = %author_id, "unsubscribed");
    Ok(())
}

/// Followed authors, each with a preview of up to `recipes_limit` newest recipes.
pub fn list<S: Store>(
    store: &mut S,
    follower: Uuid,
    page: Page,
    recipes_limit: u32,
) -> Result<Paginated<AuthorView>> {
    let authors = store.subscriptions(follower, page)?;

    let mut views = Vec::with_capacity(authors.items.len());
    for author in authors.items {
        views.push(author_view(store, author, recipes_limit)?);
    }

    Ok(Paginated {
        items: views,
        total: authors.total,
        page: authors.page,
    })
}

fn author_view<S: Store>(store: &mut S, author: User, recipes_limit: u32) -> Result<AuthorView> {
    let filter = RecipeFilter::default().by_author(author.id);
    // One row minimum so the total is still counted when no preview is wanted.
    let first_page = Page::new(Some(1), Some(recipes_limit.max(1).into()));
    let preview = store.find_recipes(&filter, None, first_page)?;

    Ok(AuthorView {
        recipes: preview
            .items
            .iter()
            .take(recipes_limit as usize)
            .map(|r| r.summary())
            .collect(),
        recipes_count: preview.total,
        is_subscribed: true,
        user: author,
    })
}
