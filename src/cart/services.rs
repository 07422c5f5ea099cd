use std::collections::BTreeMap;

use sqlx::FromRow;
use tracing::debug;
use uuid::Uuid;

use super::repo;
use crate::{db::begin_snapshot, error::AppResult, state::AppState};

/// One recipe line contributing to the shopping list.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CartLine {
    pub name: String,
    pub unit: String,
    pub amount: i64,
}

/// Total amount of one ingredient across the whole cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub unit: String,
    pub amount: i64,
}

/// Groups lines by (name, unit) and sums their amounts. The result is
/// ordered by name, then unit, in byte order.
pub fn aggregate(lines: impl IntoIterator<Item = CartLine>) -> Vec<ShoppingItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for line in lines {
        *totals.entry((line.name, line.unit)).or_insert(0) += line.amount;
    }
    totals
        .into_iter()
        .map(|((name, unit), amount)| ShoppingItem { name, unit, amount })
        .collect()
}

/// `"<name> (<unit>) - <amount>"` per item, newline separated.
pub fn render_report(items: &[ShoppingItem]) -> String {
    items
        .iter()
        .map(|i| format!("{} ({}) - {}", i.name, i.unit, i.amount))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the user's shopping list from one consistent snapshot of the cart.
pub async fn build_shopping_list(st: &AppState, user_id: Uuid) -> AppResult<String> {
    let mut tx = begin_snapshot(&st.db).await?;
    let lines = repo::fetch_cart_lines(&mut tx, user_id).await?;
    tx.commit().await?;

    let items = aggregate(lines);
    debug!(%user_id, items = items.len(), "shopping list built");
    Ok(render_report(&items))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, amount: i64) -> CartLine {
        CartLine {
            name: name.into(),
            unit: unit.into(),
            amount,
        }
    }

    #[test]
    fn sums_across_recipes_and_sorts_by_name() {
        // recipe A: 200 g flour; recipe B: 300 g flour, 2 eggs
        let lines = vec![
            line("flour", "g", 200),
            line("flour", "g", 300),
            line("eggs", "pcs", 2),
        ];
        let report = render_report(&aggregate(lines));
        assert_eq!(report, "eggs (pcs) - 2\nflour (g) - 500");
    }

    #[test]
    fn empty_cart_gives_empty_report() {
        let items = aggregate(Vec::new());
        assert!(items.is_empty());
        assert_eq!(render_report(&items), "");
    }

    #[test]
    fn same_name_with_different_units_stays_apart() {
        let items = aggregate(vec![
            line("milk", "ml", 250),
            line("milk", "cup", 1),
            line("milk", "ml", 250),
        ]);
        assert_eq!(
            items,
            vec![
                ShoppingItem { name: "milk".into(), unit: "cup".into(), amount: 1 },
                ShoppingItem { name: "milk".into(), unit: "ml".into(), amount: 500 },
            ]
        );
    }

    #[test]
    fn ordering_is_bytewise() {
        let items = aggregate(vec![line("sugar", "g", 1), line("Salt", "g", 1), line("apple", "pcs", 3)]);
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Salt", "apple", "sugar"]);
    }

    #[test]
    fn sums_do_not_overflow_i32() {
        let items = aggregate(vec![line("rice", "g", i32::MAX as i64), line("rice", "g", i32::MAX as i64)]);
        assert_eq!(items[0].amount, 2 * i32::MAX as i64);
    }

    #[test]
    fn no_trailing_newline() {
        let report = render_report(&aggregate(vec![line("a", "g", 1), line("b", "g", 2)]));
        assert!(!report.ends_with('\n'));
        assert_eq!(report.lines().count(), 2);
    }
}
