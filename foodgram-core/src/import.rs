//! Ingredient reference data import.
//!
//! Accepts the two seed formats:
//! - JSON: `[{"name": "абрикосовое варенье", "measurement_unit": "г"}, ...]`
//! - CSV: one `name,unit` row per line, fields optionally double-quoted

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::error::Result;
use crate::store::Store;
use crate::types::NewIngredient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Json,
    Csv,
}

impl ImportFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Some(ImportFormat::Json),
            Some("csv") => Some(ImportFormat::Csv),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Line {line}: {message}")]
    InvalidRow { line: usize, message: String },
}

pub fn parse_ingredients(
    format: ImportFormat,
    input: &str,
) -> Result<Vec<NewIngredient>, ImportError> {
    let items = match format {
        ImportFormat::Json => parse_json(input)?,
        ImportFormat::Csv => parse_csv(input)?,
    };
    Ok(items)
}

fn parse_json(input: &str) -> Result<Vec<NewIngredient>, ImportError> {
    let raw: Vec<NewIngredient> = serde_json::from_str(input)?;

    raw.into_iter()
        .enumerate()
        .map(|(index, item)| clean(index + 1, &item.name, &item.measurement_unit))
        .collect()
}

fn parse_csv(input: &str) -> Result<Vec<NewIngredient>, ImportError> {
    let mut items = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let fields = split_csv_line(line);
        if fields.len() != 2 {
            return Err(ImportError::InvalidRow {
                line: line_no,
                message: format!("expected 2 fields, found {}", fields.len()),
            });
        }

        items.push(clean(line_no, &fields[0], &fields[1])?);
    }

    Ok(items)
}

fn clean(line: usize, name: &str, unit: &str) -> Result<NewIngredient, ImportError> {
    let name = name.trim();
    let unit = unit.trim();

    if name.is_empty() {
        return Err(ImportError::InvalidRow {
            line,
            message: "ingredient name is empty".to_string(),
        });
    }
    if unit.is_empty() {
        return Err(ImportError::InvalidRow {
            line,
            message: format!("measurement unit is empty for {}", name),
        });
    }

    Ok(NewIngredient {
        name: name.to_string(),
        measurement_unit: unit.to_string(),
    })
}

/// Split on commas outside double quotes. `""` inside quotes is a literal quote.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => {
                in_quotes = !in_quotes;
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
}

/// Insert parsed ingredients, ignoring repeats within the input and rows that already exist.
/// Returns the number of newly inserted ingredients.
pub fn import_ingredients<S: Store>(store: &mut S, items: &[NewIngredient]) -> Result<usize> {
    let mut seen = HashSet::new();
    let unique: Vec<NewIngredient> = items
        .iter()
        .filter(|item| seen.insert((*item).clone()))
        .cloned()
        .collect();

    let inserted = store.insert_ingredients(&unique)?;
    tracing::info!(
        parsed = items.len(),
        unique = unique.len(),
        inserted,
        "imported ingredients"
    );
    Ok(inserted)
}
