//! One-shot administrative commands run from the server binary.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use diesel::prelude::*;
use foodgram_core::{import_ingredients, parse_ingredients, ImportFormat};

use crate::db::DbPool;
use crate::schema::users;
use crate::store::PgStore;

/// Load an ingredient catalogue (JSON or CSV) into the database.
/// Existing (name, unit) pairs are left untouched.
pub fn import_ingredients_file(pool: &DbPool, path: &Path) -> Result<usize> {
    let Some(format) = ImportFormat::from_path(path) else {
        bail!(
            "Unsupported file type for {}, expected .json or .csv",
            path.display()
        );
    };

    let input =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let items = parse_ingredients(format, &input)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let mut conn = pool.get().context("Failed to get database connection")?;
    let mut store = PgStore::new(&mut conn);
    let inserted = import_ingredients(&mut store, &items)?;

    tracing::info!(
        path = %path.display(),
        parsed = items.len(),
        inserted,
        "Ingredient import finished"
    );
    Ok(inserted)
}

/// Give an existing user administrator rights.
pub fn grant_admin(pool: &DbPool, email: &str) -> Result<()> {
    let email = email.trim().to_lowercase();
    let mut conn = pool.get().context("Failed to get database connection")?;

    let updated = diesel::update(users::table.filter(users::email.eq(&email)))
        .set(users::is_admin.eq(true))
        .execute(&mut conn)
        .context("Failed to update user")?;

    if updated == 0 {
        bail!("No user with email {}", email);
    }

    tracing::info!(email = %email, "Granted administrator rights");
    Ok(())
}
