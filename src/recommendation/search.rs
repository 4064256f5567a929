//! Catalog search strategies for include recommendations.

use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::repo::CatalogStore;
use crate::catalog::repo_types::{Exclusions, MacroProportions, ProductRecord};

pub const MAX_RECOMMENDED: usize = 4;
pub const RANKED_CANDIDATES: usize = 30;
pub const MAX_ATTEMPTS: u32 = 50;
const INITIAL_TOLERANCE: f64 = 5.0;
const RESET_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// Nearest by the two heaviest proportion weights.
    #[default]
    Ranked,
    /// Widening share window, one product at a time.
    #[serde(rename = "tolerance")]
    ProgressiveTolerance,
}

impl FromStr for SearchStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ranked" => Ok(Self::Ranked),
            "tolerance" => Ok(Self::ProgressiveTolerance),
            other => Err(anyhow!("unknown recommendation strategy: {other}")),
        }
    }
}

pub async fn search(
    catalog: &dyn CatalogStore,
    strategy: SearchStrategy,
    target: &MacroProportions,
    exclusions: Exclusions,
) -> anyhow::Result<Vec<ProductRecord>> {
    match strategy {
        SearchStrategy::Ranked => ranked_search(catalog, target, &exclusions).await,
        SearchStrategy::ProgressiveTolerance => tolerance_search(catalog, target, exclusions).await,
    }
}

/// Up to four products with mutually distinct categories, nearest first.
pub async fn ranked_search(
    catalog: &dyn CatalogStore,
    target: &MacroProportions,
    exclusions: &Exclusions,
) -> anyhow::Result<Vec<ProductRecord>> {
    let (primary, secondary) = target.two_largest();
    let ranked = catalog
        .rank_by_macro_distance(primary, secondary, exclusions, RANKED_CANDIDATES)
        .await?;

    let mut seen_categories = Vec::new();
    let mut picked = Vec::with_capacity(MAX_RECOMMENDED);
    for product in ranked {
        if picked.len() == MAX_RECOMMENDED {
            break;
        }
        let Some(category_id) = product.category_id() else {
            continue;
        };
        if seen_categories.contains(&category_id) {
            continue;
        }
        seen_categories.push(category_id);
        picked.push(product);
    }
    debug!(
        primary = %primary.nutrient,
        secondary = %secondary.nutrient,
        found = picked.len(),
        "ranked search finished"
    );
    Ok(picked)
}

fn widen(tolerance: f64) -> f64 {
    if tolerance < 10.0 {
        tolerance + 5.0
    } else {
        tolerance + 20.0
    }
}

/// Widens a ±tolerance share window until a product fits, excluding each found
/// product's category for the next round. Stops at four products or when a round
/// exhausts its attempts.
pub async fn tolerance_search(
    catalog: &dyn CatalogStore,
    target: &MacroProportions,
    mut exclusions: Exclusions,
) -> anyhow::Result<Vec<ProductRecord>> {
    let mut picked = Vec::with_capacity(MAX_RECOMMENDED);
    let mut tolerance = INITIAL_TOLERANCE;

    while picked.len() < MAX_RECOMMENDED {
        let mut found = None;
        for _ in 0..MAX_ATTEMPTS {
            found = catalog
                .filter_by_proportion_range(target, tolerance, &exclusions)
                .await?;
            tolerance = widen(tolerance);
            if found.is_some() {
                break;
            }
        }
        let Some(product) = found else {
            break;
        };
        if let Some(category_id) = product.category_id() {
            exclusions.exclude_category(category_id);
        }
        exclusions.exclude_product(product.id);
        picked.push(product);
        tolerance = RESET_TOLERANCE;
    }
    debug!(found = picked.len(), "tolerance search finished");
    Ok(picked)
}
