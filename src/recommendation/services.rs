use serde::Serialize;
use time::Date;
use tracing::{debug, warn};
use uuid::Uuid;

use super::gaps::{GapPattern, MacroGaps};
use super::search::{search, SearchStrategy};
use crate::calculator::services::assess_measurement;
use crate::catalog::repo_types::{Exclusions, MacroProportions, ProductRecord};
use crate::errors::NutritionError;
use crate::intake::repo_types::PortionLine;
use crate::intake::services::{aggregate, day_events, eaten_lines};
use crate::profiles::repo_types::Profile;
use crate::profiles::services::{current_measurement, load_profile};
use crate::state::AppState;

/// Product lines that must be eaten on the day before anything is recommended.
pub const MIN_EATEN_LINES: usize = 3;

/// Everything the include and exclude queries derive from one day.
struct DayAnalysis {
    profile: Profile,
    gaps: MacroGaps,
    candidate: ProductRecord,
}

/// Eaten product lowest in the macro that is furthest below target. Equal values
/// keep the lower product id.
pub fn exclusion_candidate<'a>(
    gaps: &MacroGaps,
    eaten: &[&'a PortionLine],
) -> Option<&'a ProductRecord> {
    let nutrient = gaps.largest();
    let mut products: Vec<&ProductRecord> = eaten.iter().map(|l| &l.product).collect();
    products.sort_by(|a, b| {
        a.per_gram(nutrient)
            .total_cmp(&b.per_gram(nutrient))
            .then(a.id.cmp(&b.id))
    });
    products.first().copied()
}

async fn analyse_day(
    state: &AppState,
    profile_id: Uuid,
    date: Date,
) -> Result<DayAnalysis, NutritionError> {
    let profile = load_profile(state, profile_id).await?;
    let measurement = current_measurement(state, profile_id, date).await?;
    let targets = assess_measurement(&profile, &measurement)?.targets;

    let events = day_events(state, profile_id, date).await?;
    let eaten = eaten_lines(&events);
    if eaten.len() < MIN_EATEN_LINES {
        warn!(%profile_id, %date, eaten = eaten.len(), "too little eaten to recommend");
        return Err(NutritionError::InsufficientData {
            eaten: eaten.len(),
            required: MIN_EATEN_LINES,
        });
    }

    let gaps = MacroGaps::between(&targets, &aggregate(&events));
    let candidate = exclusion_candidate(&gaps, &eaten)
        .cloned()
        .ok_or(NutritionError::InsufficientData {
            eaten: 0,
            required: MIN_EATEN_LINES,
        })?;

    Ok(DayAnalysis {
        profile,
        gaps,
        candidate,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct IncludeRecommendation {
    pub pattern: GapPattern,
    pub gaps: MacroGaps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proportions: Option<MacroProportions>,
    pub strategy: SearchStrategy,
    pub products: Vec<ProductRecord>,
}

/// Products that move the day's macros towards target, searched with `strategy`
/// or the configured default.
pub async fn include_products(
    state: &AppState,
    profile_id: Uuid,
    date: Date,
    strategy: Option<SearchStrategy>,
) -> Result<IncludeRecommendation, NutritionError> {
    let strategy = strategy.unwrap_or(state.config.recommendation_strategy);
    let DayAnalysis {
        profile,
        gaps,
        candidate,
    } = analyse_day(state, profile_id, date).await?;

    let pattern = GapPattern::classify(&gaps);
    let proportions = pattern.proportions(&gaps);
    debug!(%profile_id, ?pattern, ?proportions, ?strategy, "gap pattern classified");

    let products = match proportions {
        Some(target) => {
            let mut exclusions = Exclusions {
                product_ids: profile.excluded_products.clone(),
                category_ids: profile.excluded_categories.clone(),
            };
            exclusions.exclude_product(candidate.id);
            search(state.catalog.as_ref(), strategy, &target, exclusions).await?
        }
        None => Vec::new(),
    };

    Ok(IncludeRecommendation {
        pattern,
        gaps,
        proportions,
        strategy,
        products,
    })
}

/// The eaten product worth dropping first.
pub async fn exclude_product(
    state: &AppState,
    profile_id: Uuid,
    date: Date,
) -> Result<ProductRecord, NutritionError> {
    let analysis = analyse_day(state, profile_id, date).await?;
    debug!(%profile_id, product_id = analysis.candidate.id, "exclusion candidate chosen");
    Ok(analysis.candidate)
}
