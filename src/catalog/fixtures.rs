use std::sync::Arc;

use super::repo_types::{Category, ProductRecord};
use crate::store::memory::MemoryStore;

/// Product with per-gram macros; calories follow 4/9/4, shares are derived.
pub fn product(
    id: i64,
    title: &str,
    proteins: f64,
    fats: f64,
    carbohydrates: f64,
    category_id: Option<i64>,
) -> ProductRecord {
    ProductRecord {
        id,
        title: title.into(),
        proteins,
        fats,
        carbohydrates,
        calories: proteins * 4.0 + fats * 9.0 + carbohydrates * 4.0,
        water: 0.1,
        category: category_id.map(|id| Category {
            id,
            title: format!("Category {id}"),
        }),
        shares: None,
    }
}

pub fn pantry() -> Vec<ProductRecord> {
    vec![
        product(1, "Chicken breast", 0.23, 0.02, 0.0, Some(1)),
        product(2, "Turkey fillet", 0.21, 0.05, 0.0, Some(1)),
        product(3, "Cottage cheese", 0.17, 0.05, 0.03, Some(2)),
        product(4, "Whole milk", 0.03, 0.032, 0.047, Some(2)),
        product(5, "Oats", 0.13, 0.07, 0.6, Some(3)),
        product(6, "Buckwheat", 0.13, 0.03, 0.62, Some(3)),
        product(7, "Rye bread", 0.08, 0.01, 0.48, Some(4)),
        product(8, "Banana", 0.015, 0.005, 0.21, Some(5)),
        product(9, "Apple", 0.004, 0.004, 0.1, Some(5)),
        product(10, "Walnuts", 0.15, 0.65, 0.11, Some(6)),
        product(11, "Olive oil", 0.0, 1.0, 0.0, Some(6)),
        product(12, "Pasta", 0.11, 0.013, 0.71, Some(3)),
        product(13, "Honey", 0.003, 0.0, 0.82, None),
    ]
}

pub async fn stocked_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for p in pantry() {
        store.insert_product(p).await;
    }
    store
}
