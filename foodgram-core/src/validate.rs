use std::collections::HashSet;

use crate::error::{Error, Result, ValidationErrors};
use crate::image::decode_data_uri;
use crate::types::{NewTag, RecipeDraft, ValidRecipe};

pub const MAX_NAME_LEN: usize = 200;

/// Check every field of a recipe draft, collecting all problems at once.
pub fn validate_recipe(draft: RecipeDraft) -> Result<ValidRecipe> {
    let mut errors = ValidationErrors::new();

    let name = draft.name.trim().to_string();
    if name.is_empty() {
        errors.add("name", "Name cannot be empty");
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.add(
            "name",
            format!("Name must be at most {} characters", MAX_NAME_LEN),
        );
    }

    let text = draft.text.trim().to_string();
    if text.is_empty() {
        errors.add("text", "Text cannot be empty");
    }

    if draft.cooking_time < 1 {
        errors.add("cooking_time", "Cooking time must be at least 1 minute");
    }

    let image = match decode_data_uri(&draft.image) {
        Ok(image) => Some(image),
        Err(message) => {
            errors.add("image", message);
            None
        }
    };

    if draft.tags.is_empty() {
        errors.add("tags", "At least one tag is required");
    } else {
        let unique: HashSet<_> = draft.tags.iter().collect();
        if unique.len() != draft.tags.len() {
            errors.add("tags", "Tags must not repeat");
        }
    }

    if draft.ingredients.is_empty() {
        errors.add("ingredients", "At least one ingredient is required");
    } else {
        let mut seen = HashSet::new();
        for (index, item) in draft.ingredients.iter().enumerate() {
            if !seen.insert(item.ingredient_id) {
                errors.add(
                    format!("ingredients[{}].id", index),
                    "Ingredient must not repeat",
                );
            }
            if item.amount < 1 {
                errors.add(
                    format!("ingredients[{}].amount", index),
                    "Amount must be at least 1",
                );
            }
        }
    }

    errors.into_result()?;
    let image = image.ok_or_else(|| Error::invalid("image", "Image is required"))?;

    Ok(ValidRecipe {
        name,
        text,
        cooking_time: draft.cooking_time,
        image,
        tag_ids: draft.tags,
        ingredients: draft.ingredients,
    })
}

pub fn validate_tag(tag: &NewTag) -> Result<NewTag> {
    let mut errors = ValidationErrors::new();

    let name = tag.name.trim().to_string();
    if name.is_empty() {
        errors.add("name", "Tag name cannot be empty");
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.add(
            "name",
            format!("Tag name must be at most {} characters", MAX_NAME_LEN),
        );
    }

    let color = tag.color.trim().to_uppercase();
    if !is_hex_color(&color) {
        errors.add("color", "Color must be a HEX code like #49B64E");
    }

    let slug = tag.slug.trim().to_string();
    if !is_slug(&slug) {
        errors.add(
            "slug",
            "Slug may contain only letters, digits, '-' and '_'",
        );
    } else if slug.len() > MAX_NAME_LEN {
        errors.add(
            "slug",
            format!("Slug must be at most {} characters", MAX_NAME_LEN),
        );
    }

    errors.into_result()?;
    Ok(NewTag { name, color, slug })
}

pub fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

pub fn is_slug(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
