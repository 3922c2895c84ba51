use super::model::ShoppingItem;
use super::validator::ShoppingCategory;

/// Flattens category groups into one ordered list. Category order and item
/// order within a category are kept; every item starts unchecked.
pub fn flatten(groups: Vec<ShoppingCategory>) -> Vec<ShoppingItem> {
    groups
        .into_iter()
        .flat_map(|group| {
            let category = group.category;
            group.items.into_iter().map(move |entry| ShoppingItem {
                name: entry.name,
                quantity: entry.quantity,
                category: category.clone(),
                notes: entry.notes,
                checked: false,
            })
        })
        .collect()
}
