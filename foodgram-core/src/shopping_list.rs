//! Shopping list aggregation.
//!
//! Collects every ingredient row of the recipes in a user's shopping cart and
//! sums the amounts per exact (name, measurement unit) pair. The unit is part
//! of the key: "flour (g)" and "flour (ml)" stay separate lines.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;
use crate::types::IngredientRow;

pub const HEADER: &str = "Foodgram shopping list";
pub const FOOTER: &str = "Foodgram | Bon appétit!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListEntry {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    /// Ordered by name, then unit
    pub entries: Vec<ShoppingListEntry>,
}

impl ShoppingList {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the downloadable text file.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(HEADER);
        out.push_str("\n\n");
        for entry in &self.entries {
            out.push_str(&render_line(entry));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(FOOTER);
        out.push('\n');
        out
    }
}

pub fn render_line(entry: &ShoppingListEntry) -> String {
    format!(
        "{} ({}) — {}",
        entry.name, entry.measurement_unit, entry.total
    )
}

/// Group rows by (name, unit) and sum their amounts.
pub fn aggregate<I>(rows: I) -> ShoppingList
where
    I: IntoIterator<Item = IngredientRow>,
{
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
    }

    ShoppingList {
        entries: totals
            .into_iter()
            .map(|((name, measurement_unit), total)| ShoppingListEntry {
                name,
                measurement_unit,
                total,
            })
            .collect(),
    }
}

/// Build the shopping list for a user's current cart. Read-only.
pub fn build<S: Store>(store: &mut S, user: Uuid) -> Result<ShoppingList> {
    let recipes = store.cart_recipe_ids(user)?;
    if recipes.is_empty() {
        return Ok(ShoppingList::default());
    }

    let rows = store.ingredient_rows(&recipes)?;
    let list = aggregate(rows);
    tracing::debug!(
        user_id = %user,
        recipes = recipes.len(),
        entries = list.entries.len(),
        "built shopping list"
    );
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i32) -> IngredientRow {
        IngredientRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn test_empty() {
        let list = aggregate(Vec::new());
        assert!(list.is_empty());
    }

    #[test]
    fn test_sums_same_ingredient() {
        let list = aggregate(vec![row("Сахар", "г", 5), row("Сахар", "г", 10)]);
        assert_eq!(list.entries.len(), 1);
        assert_eq!(render_line(&list.entries[0]), "Сахар (г) — 15");
    }

    #[test]
    fn test_unit_is_part_of_key() {
        let list = aggregate(vec![row("Мука", "г", 200), row("Мука", "мл", 200)]);
        assert_eq!(list.entries.len(), 2);
        assert!(list.entries.iter().all(|e| e.total == 200));
    }

    #[test]
    fn test_no_overflow_on_large_sums() {
        let rows = (0..4).map(|_| row("Вода", "мл", i32::MAX));
        let list = aggregate(rows);
        assert_eq!(list.entries[0].total, 4 * i64::from(i32::MAX));
    }

    #[test]
    fn test_ordered_by_name_then_unit() {
        let list = aggregate(vec![
            row("соль", "г", 1),
            row("молоко", "мл", 100),
            row("молоко", "г", 50),
        ]);
        let keys: Vec<(&str, &str)> = list
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.measurement_unit.as_str()))
            .collect();
        assert_eq!(keys, vec![("молоко", "г"), ("молоко", "мл"), ("соль", "г")]);
    }

    #[test]
    fn test_render() {
        let list = aggregate(vec![row("Сахар", "г", 15), row("Яйца", "шт", 2)]);
        let text = list.render();
        assert!(text.starts_with(HEADER));
        assert!(text.contains("\nСахар (г) — 15\n"));
        assert!(text.contains("\nЯйца (шт) — 2\n"));
        assert!(text.trim_end().ends_with(FOOTER));
    }

    #[test]
    fn test_render_empty_has_no_lines() {
        let text = ShoppingList::default().render();
        assert!(!text.contains('—'));
    }
}
