use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::repo_types::ProductRecord;
use crate::errors::NutritionError;

/// A product and the grams eaten of it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PortionLine {
    pub product: ProductRecord,
    pub weight_g: f64,
}

/// Immutable snapshot of a recipe. Editing a recipe retires the current version and
/// adds a new one under the same `recipe_id`; events keep pointing at `version_id`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecipeVersion {
    pub version_id: Uuid,
    pub recipe_id: Uuid,
    pub version: i32,
    pub profile_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_current: bool,
    pub lines: Vec<PortionLine>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsumedItem {
    Portion(PortionLine),
    Recipe(RecipeVersion),
    Water { volume_ml: f64 },
}

/// A logged eating, resolved down to product data.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConsumptionEvent {
    pub id: Uuid,
    pub profile_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub eaten_at: OffsetDateTime,
    pub item: ConsumedItem,
}

impl ConsumptionEvent {
    /// Product lines this event contributes; empty for water.
    pub fn portions(&self) -> &[PortionLine] {
        match &self.item {
            ConsumedItem::Portion(line) => std::slice::from_ref(line),
            ConsumedItem::Recipe(recipe) => &recipe.lines,
            ConsumedItem::Water { .. } => &[],
        }
    }

    pub fn water_ml(&self) -> f64 {
        match self.item {
            ConsumedItem::Water { volume_ml } => volume_ml,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct NewPortion {
    pub product_id: i64,
    pub weight_g: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecipe {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub lines: Vec<NewPortion>,
}

impl NewRecipe {
    pub fn validate(&self) -> Result<(), NutritionError> {
        if self.title.trim().is_empty() {
            return Err(NutritionError::validation("title", "must not be empty"));
        }
        if self.lines.is_empty() {
            return Err(NutritionError::validation("lines", "Product not found"));
        }
        if self.lines.iter().any(|l| !(l.weight_g > 0.0)) {
            return Err(NutritionError::validation("lines", "weights must be positive"));
        }
        Ok(())
    }
}

/// Request to log an eating: exactly one of product, recipe or water.
#[derive(Debug, Clone, Deserialize)]
pub struct NewConsumption {
    #[serde(default)]
    pub product: Option<NewPortion>,
    #[serde(default)]
    pub recipe_id: Option<Uuid>,
    #[serde(default)]
    pub water_ml: Option<f64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub eaten_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsumptionEntry {
    Portion(NewPortion),
    Recipe(Uuid),
    Water(f64),
}

impl NewConsumption {
    pub fn into_entry(self) -> Result<ConsumptionEntry, NutritionError> {
        let entry = match (self.product, self.recipe_id, self.water_ml) {
            (Some(portion), None, None) => ConsumptionEntry::Portion(portion),
            (None, Some(recipe_id), None) => ConsumptionEntry::Recipe(recipe_id),
            (None, None, Some(volume)) => ConsumptionEntry::Water(volume),
            _ => {
                return Err(NutritionError::validation(
                    "eating",
                    "exactly one of product, recipe_id or water_ml is required",
                ))
            }
        };
        match entry {
            ConsumptionEntry::Portion(p) if !(p.weight_g > 0.0) => {
                Err(NutritionError::validation("product.weight_g", "must be positive"))
            }
            ConsumptionEntry::Water(v) if !(v > 0.0) => {
                Err(NutritionError::validation("water_ml", "must be positive"))
            }
            entry => Ok(entry),
        }
    }
}

/// What a stored event points at. Recipes are pinned to a version.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventPayload {
    Portion(NewPortion),
    RecipeVersion(Uuid),
    Water(f64),
}

#[derive(Debug, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub eaten_at: OffsetDateTime,
    pub product_id: Option<i64>,
    pub weight_g: Option<f64>,
    pub recipe_version_id: Option<Uuid>,
    pub water_ml: Option<f64>,
}

#[derive(Debug, FromRow)]
pub struct RecipeVersionRow {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub version: i32,
    pub profile_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_current: bool,
}

#[derive(Debug, FromRow)]
pub struct RecipeLineRow {
    pub recipe_version_id: Uuid,
    pub product_id: i64,
    pub weight_g: f64,
}
