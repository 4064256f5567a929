use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The three macronutrients matched by the recommendation search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Macro {
    Proteins,
    Fats,
    Carbohydrates,
}

impl Macro {
    /// Declaration order; equal weights keep this order when sorted.
    pub const ALL: [Macro; 3] = [Macro::Proteins, Macro::Fats, Macro::Carbohydrates];

    /// Column in `catalog_products` holding the product's share of this macro.
    pub(crate) fn share_column(self) -> &'static str {
        match self {
            Macro::Proteins => "protein_share",
            Macro::Fats => "fat_share",
            Macro::Carbohydrates => "carbohydrate_share",
        }
    }
}

impl fmt::Display for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Macro::Proteins => "proteins",
            Macro::Fats => "fats",
            Macro::Carbohydrates => "carbohydrates",
        })
    }
}

/// One value per macro. Used for a product's percentage split of its own macro mass
/// and for the relative weighting the recommendation search aims at.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MacroProportions {
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
}

impl MacroProportions {
    pub fn new(proteins: f64, fats: f64, carbohydrates: f64) -> Self {
        Self {
            proteins,
            fats,
            carbohydrates,
        }
    }

    /// Percentage split of the macro mass; all zero for a product without macros.
    pub fn from_macro_mass(proteins: f64, fats: f64, carbohydrates: f64) -> Self {
        let total = proteins + fats + carbohydrates;
        if total <= 0.0 {
            return Self::default();
        }
        Self::new(
            proteins * 100.0 / total,
            fats * 100.0 / total,
            carbohydrates * 100.0 / total,
        )
    }

    pub fn get(&self, nutrient: Macro) -> f64 {
        match nutrient {
            Macro::Proteins => self.proteins,
            Macro::Fats => self.fats,
            Macro::Carbohydrates => self.carbohydrates,
        }
    }

    /// Largest and second-largest entries; ties keep `Macro::ALL` order.
    pub fn two_largest(&self) -> (MacroWeight, MacroWeight) {
        let mut weights = Macro::ALL.map(|nutrient| MacroWeight {
            nutrient,
            value: self.get(nutrient),
        });
        weights.sort_by(|a, b| b.value.total_cmp(&a.value));
        (weights[0], weights[1])
    }

    pub fn within(&self, target: &MacroProportions, tolerance: f64) -> bool {
        Macro::ALL.into_iter().all(|m| {
            let value = self.get(m);
            value >= target.get(m) - tolerance && value <= target.get(m) + tolerance
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroWeight {
    pub nutrient: Macro,
    pub value: f64,
}

impl MacroWeight {
    pub fn distance(&self, shares: &MacroProportions) -> f64 {
        (shares.get(self.nutrient) - self.value).abs()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub title: String,
}

/// Catalog product; nutrient fields are per gram.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub id: i64,
    pub title: String,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
    pub calories: f64,
    pub water: f64,
    pub category: Option<Category>,
    #[serde(skip)]
    pub shares: Option<MacroProportions>,
}

impl ProductRecord {
    pub fn per_gram(&self, nutrient: Macro) -> f64 {
        match nutrient {
            Macro::Proteins => self.proteins,
            Macro::Fats => self.fats,
            Macro::Carbohydrates => self.carbohydrates,
        }
    }

    /// Stored shares, or shares derived from the per-gram macros when none are stored.
    pub fn macro_shares(&self) -> MacroProportions {
        self.shares.unwrap_or_else(|| {
            MacroProportions::from_macro_mass(self.proteins, self.fats, self.carbohydrates)
        })
    }

    pub fn category_id(&self) -> Option<i64> {
        self.category.as_ref().map(|c| c.id)
    }
}

/// Products and categories a catalog query must skip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions {
    pub product_ids: Vec<i64>,
    pub category_ids: Vec<i64>,
}

impl Exclusions {
    pub fn excludes(&self, product: &ProductRecord) -> bool {
        self.product_ids.contains(&product.id)
            || product
                .category_id()
                .is_some_and(|id| self.category_ids.contains(&id))
    }

    pub fn exclude_product(&mut self, id: i64) {
        if !self.product_ids.contains(&id) {
            self.product_ids.push(id);
        }
    }

    pub fn exclude_category(&mut self, id: i64) {
        if !self.category_ids.contains(&id) {
            self.category_ids.push(id);
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub title: String,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
    pub calories: f64,
    pub water: f64,
    pub category_id: Option<i64>,
    pub category_title: Option<String>,
    pub protein_share: f64,
    pub fat_share: f64,
    pub carbohydrate_share: f64,
}

impl From<ProductRow> for ProductRecord {
    fn from(r: ProductRow) -> Self {
        let category = match (r.category_id, r.category_title) {
            (Some(id), Some(title)) => Some(Category { id, title }),
            _ => None,
        };
        Self {
            id: r.id,
            title: r.title,
            proteins: r.proteins,
            fats: r.fats,
            carbohydrates: r.carbohydrates,
            calories: r.calories,
            water: r.water,
            category,
            shares: Some(MacroProportions::new(
                r.protein_share,
                r.fat_share,
                r.carbohydrate_share,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_derive_from_macro_mass() {
        let s = MacroProportions::from_macro_mass(0.2, 0.2, 0.6);
        assert!((s.proteins - 20.0).abs() < 1e-9);
        assert!((s.carbohydrates - 60.0).abs() < 1e-9);
        assert_eq!(MacroProportions::from_macro_mass(0.0, 0.0, 0.0), MacroProportions::default());
    }

    #[test]
    fn two_largest_keeps_declaration_order_on_ties() {
        let (first, second) = MacroProportions::new(2.0, 2.0, 1.0).two_largest();
        assert_eq!(first.nutrient, Macro::Proteins);
        assert_eq!(second.nutrient, Macro::Fats);

        let (first, second) = MacroProportions::new(1.0, 3.0, 3.0).two_largest();
        assert_eq!(first.nutrient, Macro::Fats);
        assert_eq!(second.nutrient, Macro::Carbohydrates);
    }

    #[test]
    fn window_check_is_inclusive() {
        let shares = MacroProportions::new(30.0, 20.0, 50.0);
        assert!(shares.within(&MacroProportions::new(25.0, 25.0, 45.0), 5.0));
        assert!(!shares.within(&MacroProportions::new(25.0, 25.0, 44.0), 5.0));
    }

    #[test]
    fn exclusions_match_product_or_category() {
        let product = ProductRecord {
            id: 7,
            title: "Rice".into(),
            proteins: 0.07,
            fats: 0.01,
            carbohydrates: 0.78,
            calories: 3.4,
            water: 0.12,
            category: Some(Category { id: 3, title: "Grains".into() }),
            shares: None,
        };
        let mut ex = Exclusions::default();
        assert!(!ex.excludes(&product));
        ex.exclude_category(3);
        assert!(ex.excludes(&product));
        let ex = Exclusions { product_ids: vec![7], category_ids: vec![] };
        assert!(ex.excludes(&product));
    }
}
