use serde::Serialize;
use time::{Date, OffsetDateTime};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::repo_types::{
    ConsumptionEntry, ConsumptionEvent, EventPayload, NewConsumption, NewRecipe, PortionLine,
    RecipeVersion,
};
use crate::calculator::anthropometry::{body_composition, BodyComposition};
use crate::calculator::targets::{round_half_even, DailyNutrients};
use crate::errors::NutritionError;
use crate::profiles::services::load_profile;
use crate::state::AppState;

/// Sums per-gram nutrients times eaten weight, plus logged water, rounded per field.
pub fn aggregate(events: &[ConsumptionEvent]) -> DailyNutrients {
    let (mut calories, mut proteins, mut fats, mut carbohydrates, mut water) =
        (0.0, 0.0, 0.0, 0.0, 0.0);
    for event in events {
        for PortionLine { product, weight_g } in event.portions() {
            calories += product.calories * weight_g;
            proteins += product.proteins * weight_g;
            fats += product.fats * weight_g;
            carbohydrates += product.carbohydrates * weight_g;
            water += product.water * weight_g;
        }
        water += event.water_ml();
    }
    DailyNutrients {
        calories: round_half_even(calories),
        proteins: round_half_even(proteins),
        fats: round_half_even(fats),
        carbohydrates: round_half_even(carbohydrates),
        water: round_half_even(water),
    }
}

/// Product lines eaten across the events; each recipe ingredient counts once.
pub fn eaten_lines(events: &[ConsumptionEvent]) -> Vec<&PortionLine> {
    events.iter().flat_map(|e| e.portions()).collect()
}

pub async fn day_events(
    state: &AppState,
    profile_id: Uuid,
    date: Date,
) -> Result<Vec<ConsumptionEvent>, NutritionError> {
    Ok(state.consumption.list_events(profile_id, date).await?)
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyIntake {
    #[serde(flatten)]
    pub totals: DailyNutrients,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyComposition>,
}

/// Intake for `date`. Body composition is attached when a measurement exists.
pub async fn current_intake(
    state: &AppState,
    profile_id: Uuid,
    date: Date,
) -> Result<DailyIntake, NutritionError> {
    let profile = load_profile(state, profile_id).await?;
    let events = day_events(state, profile_id, date).await?;
    let totals = aggregate(&events);

    let body = match state.profiles.get_latest_measurement(profile_id, date).await? {
        Some(m) => Some(body_composition(
            profile.gender,
            m.effective_hand_cm(&profile),
            m.weight_kg,
            profile.height_cm,
        )?),
        None => None,
    };
    debug!(%profile_id, %date, events = events.len(), calories = totals.calories, "intake aggregated");

    Ok(DailyIntake { totals, body })
}

async fn ensure_products(state: &AppState, recipe: &NewRecipe) -> Result<(), NutritionError> {
    for line in &recipe.lines {
        if state.catalog.get(line.product_id).await?.is_none() {
            return Err(NutritionError::not_found("product", line.product_id));
        }
    }
    Ok(())
}

/// Current version of a recipe owned by `profile_id`.
async fn owned_recipe(
    state: &AppState,
    profile_id: Uuid,
    recipe_id: Uuid,
) -> Result<RecipeVersion, NutritionError> {
    match state.consumption.current_recipe(recipe_id).await? {
        Some(recipe) if recipe.profile_id == profile_id => Ok(recipe),
        _ => Err(NutritionError::not_found("recipe", recipe_id)),
    }
}

#[instrument(skip(state, new))]
pub async fn record_consumption(
    state: &AppState,
    profile_id: Uuid,
    new: NewConsumption,
) -> Result<Uuid, NutritionError> {
    load_profile(state, profile_id).await?;
    let eaten_at = new.eaten_at.unwrap_or_else(OffsetDateTime::now_utc);

    let payload = match new.into_entry()? {
        ConsumptionEntry::Portion(portion) => {
            if state.catalog.get(portion.product_id).await?.is_none() {
                return Err(NutritionError::not_found("product", portion.product_id));
            }
            EventPayload::Portion(portion)
        }
        ConsumptionEntry::Recipe(recipe_id) => {
            let recipe = owned_recipe(state, profile_id, recipe_id).await?;
            EventPayload::RecipeVersion(recipe.version_id)
        }
        ConsumptionEntry::Water(volume_ml) => EventPayload::Water(volume_ml),
    };

    let event_id = state
        .consumption
        .record_event(profile_id, payload, eaten_at)
        .await?;
    debug!(%event_id, "consumption recorded");
    Ok(event_id)
}

pub async fn delete_consumption(
    state: &AppState,
    profile_id: Uuid,
    event_id: Uuid,
) -> Result<(), NutritionError> {
    if state.consumption.delete_event(profile_id, event_id).await? {
        Ok(())
    } else {
        Err(NutritionError::not_found("consumption event", event_id))
    }
}

pub async fn create_recipe(
    state: &AppState,
    profile_id: Uuid,
    new: &NewRecipe,
) -> Result<RecipeVersion, NutritionError> {
    load_profile(state, profile_id).await?;
    new.validate()?;
    ensure_products(state, new).await?;
    let recipe = state.consumption.create_recipe(profile_id, new).await?;
    debug!(recipe_id = %recipe.recipe_id, "recipe created");
    Ok(recipe)
}

/// Retires the current version; events recorded earlier keep the content they ate.
pub async fn revise_recipe(
    state: &AppState,
    profile_id: Uuid,
    recipe_id: Uuid,
    new: &NewRecipe,
) -> Result<RecipeVersion, NutritionError> {
    new.validate()?;
    owned_recipe(state, profile_id, recipe_id).await?;
    ensure_products(state, new).await?;
    let recipe = state
        .consumption
        .revise_recipe(recipe_id, new)
        .await?
        .ok_or_else(|| NutritionError::not_found("recipe", recipe_id))?;
    debug!(%recipe_id, version = recipe.version, "recipe revised");
    Ok(recipe)
}


#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::fixtures::portion;
    use super::*;
    use crate::catalog::fixtures::pantry;
    use crate::intake::repo_types::NewPortion;
    use crate::profiles::services::fixtures::seeded_store;

    async fn state_with_pantry() -> (AppState, Uuid) {
        let (store, profile) = seeded_store().await;
        for p in pantry() {
            store.insert_product(p).await;
        }
        (AppState::fake(store), profile.id)
    }

    #[test]
    fn no_events_means_zero_intake() {
        assert_eq!(aggregate(&[]), DailyNutrients::default());
    }

    #[tokio::test]
    async fn portions_and_water_are_summed() {
        let (state, profile_id) = state_with_pantry().await;
        let noon = datetime!(2024-02-04 12:00 UTC);
        record_consumption(&state, profile_id, portion(1, 200.0, noon)).await.unwrap();
        record_consumption(&state, profile_id, portion(5, 40.0, noon)).await.unwrap();
        let water = NewConsumption {
            product: None,
            recipe_id: None,
            water_ml: Some(500.0),
            eaten_at: Some(noon),
        };
        record_consumption(&state, profile_id, water).await.unwrap();

        let intake = current_intake(&state, profile_id, date!(2024 - 02 - 04)).await.unwrap();
        // chicken 200 g: 46 p, 4 f, 0 c; oats 40 g: 5.2 p, 2.8 f, 24 c
        assert_eq!(intake.totals.proteins, 51);
        assert_eq!(intake.totals.fats, 7);
        assert_eq!(intake.totals.carbohydrates, 24);
        // 200 g * 0.1 + 40 g * 0.1 + 500 ml
        assert_eq!(intake.totals.water, 524);
        assert!(intake.body.is_some());
    }

    #[tokio::test]
    async fn other_days_are_not_counted() {
        let (state, profile_id) = state_with_pantry().await;
        record_consumption(&state, profile_id, portion(1, 100.0, datetime!(2024-02-03 23:59 UTC)))
            .await
            .unwrap();
        let intake = current_intake(&state, profile_id, date!(2024 - 02 - 04)).await.unwrap();
        assert_eq!(intake.totals, DailyNutrients::default());
    }

    #[tokio::test]
    async fn intake_without_measurement_has_no_body() {
        let (state, profile_id) = state_with_pantry().await;
        let intake = current_intake(&state, profile_id, date!(2024 - 01 - 01)).await.unwrap();
        assert!(intake.body.is_none());
        assert_eq!(intake.totals, DailyNutrients::default());
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let (state, profile_id) = state_with_pantry().await;
        let err = record_consumption(&state, profile_id, portion(999, 100.0, datetime!(2024-02-04 09:00 UTC)))
            .await
            .unwrap_err();
        assert!(matches!(err, NutritionError::NotFound { entity: "product", .. }));
    }

    #[tokio::test]
    async fn revised_recipe_keeps_earlier_events_on_old_version() {
        let (state, profile_id) = state_with_pantry().await;
        let porridge = NewRecipe {
            title: "Porridge".into(),
            description: None,
            lines: vec![
                NewPortion { product_id: 5, weight_g: 60.0 },
                NewPortion { product_id: 4, weight_g: 200.0 },
            ],
        };
        let v1 = create_recipe(&state, profile_id, &porridge).await.unwrap();
        assert_eq!(v1.version, 1);

        let breakfast = NewConsumption {
            product: None,
            recipe_id: Some(v1.recipe_id),
            water_ml: None,
            eaten_at: Some(datetime!(2024-02-04 08:30 UTC)),
        };
        record_consumption(&state, profile_id, breakfast).await.unwrap();
        let before = current_intake(&state, profile_id, date!(2024 - 02 - 04)).await.unwrap();

        let bigger = NewRecipe {
            lines: vec![NewPortion { product_id: 5, weight_g: 120.0 }],
            ..porridge
        };
        let v2 = revise_recipe(&state, profile_id, v1.recipe_id, &bigger).await.unwrap();
        assert_eq!(v2.version, 2);
        assert_eq!(v2.recipe_id, v1.recipe_id);
        assert_ne!(v2.version_id, v1.version_id);

        let after = current_intake(&state, profile_id, date!(2024 - 02 - 04)).await.unwrap();
        assert_eq!(before.totals, after.totals);

        let current = state.consumption.current_recipe(v1.recipe_id).await.unwrap().unwrap();
        assert_eq!(current.version_id, v2.version_id);
    }

    #[tokio::test]
    async fn concurrent_revisions_each_get_a_version() {
        let (state, profile_id) = state_with_pantry().await;
        let salad = NewRecipe {
            title: "Fruit salad".into(),
            description: None,
            lines: vec![NewPortion { product_id: 8, weight_g: 100.0 }],
        };
        let v1 = create_recipe(&state, profile_id, &salad).await.unwrap();
        let with_apple = NewRecipe {
            lines: vec![
                NewPortion { product_id: 8, weight_g: 100.0 },
                NewPortion { product_id: 9, weight_g: 80.0 },
            ],
            ..salad.clone()
        };
        let with_walnuts = NewRecipe {
            lines: vec![
                NewPortion { product_id: 8, weight_g: 100.0 },
                NewPortion { product_id: 10, weight_g: 15.0 },
            ],
            ..salad
        };

        let (a, b) = tokio::join!(
            revise_recipe(&state, profile_id, v1.recipe_id, &with_apple),
            revise_recipe(&state, profile_id, v1.recipe_id, &with_walnuts),
        );
        let mut versions = vec![a.unwrap().version, b.unwrap().version];
        versions.sort_unstable();
        assert_eq!(versions, vec![2, 3]);

        let current = state.consumption.current_recipe(v1.recipe_id).await.unwrap().unwrap();
        assert_eq!(current.version, 3);
    }

    #[tokio::test]
    async fn midnight_starts_the_next_day() {
        let (state, profile_id) = state_with_pantry().await;
        record_consumption(&state, profile_id, portion(1, 100.0, datetime!(2024-02-04 23:59:59 UTC)))
            .await
            .unwrap();
        record_consumption(&state, profile_id, portion(2, 100.0, datetime!(2024-02-05 00:00 UTC)))
            .await
            .unwrap();

        let fourth = current_intake(&state, profile_id, date!(2024 - 02 - 04)).await.unwrap();
        let fifth = current_intake(&state, profile_id, date!(2024 - 02 - 05)).await.unwrap();
        // chicken 100 g: 23 p; turkey 100 g: 21 p
        assert_eq!(fourth.totals.proteins, 23);
        assert_eq!(fifth.totals.proteins, 21);
    }

    #[tokio::test]
    async fn recipe_with_unknown_product_is_rejected() {
        let (state, profile_id) = state_with_pantry().await;
        let recipe = NewRecipe {
            title: "Salad".into(),
            description: None,
            lines: vec![NewPortion { product_id: 404, weight_g: 80.0 }],
        };
        let err = create_recipe(&state, profile_id, &recipe).await.unwrap_err();
        assert!(matches!(err, NutritionError::NotFound { entity: "product", .. }));
    }

    #[tokio::test]
    async fn deleting_unknown_event_is_not_found() {
        let (state, profile_id) = state_with_pantry().await;
        let event_id = record_consumption(&state, profile_id, portion(2, 100.0, datetime!(2024-02-04 10:00 UTC)))
            .await
            .unwrap();
        delete_consumption(&state, profile_id, event_id).await.unwrap();
        let err = delete_consumption(&state, profile_id, event_id).await.unwrap_err();
        assert!(matches!(err, NutritionError::NotFound { .. }));
    }
}
