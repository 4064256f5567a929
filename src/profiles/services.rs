use time::Date;
use tracing::{debug, warn};
use uuid::Uuid;

use super::repo_types::{
    Measurement, NewMeasurement, NewProfile, Profile, ProfileUpdate, MAX_EXCLUDED_CATEGORIES,
    MAX_EXCLUDED_PRODUCTS,
};
use crate::errors::NutritionError;
use crate::state::AppState;

pub async fn load_profile(state: &AppState, profile_id: Uuid) -> Result<Profile, NutritionError> {
    state
        .profiles
        .get_profile(profile_id)
        .await?
        .ok_or_else(|| NutritionError::not_found("profile", profile_id))
}

/// Latest measurement on or before `date`; its absence is an error, never a default.
pub async fn current_measurement(
    state: &AppState,
    profile_id: Uuid,
    date: Date,
) -> Result<Measurement, NutritionError> {
    match state.profiles.get_latest_measurement(profile_id, date).await? {
        Some(m) => Ok(m),
        None => {
            warn!(%profile_id, %date, "no measurement on or before date");
            Err(NutritionError::MeasurementNotFound { profile_id, date })
        }
    }
}

fn check_positive(field: &'static str, value: Option<f64>) -> Result<(), NutritionError> {
    match value {
        Some(v) if !(v > 0.0) => Err(NutritionError::validation(field, "must be positive")),
        _ => Ok(()),
    }
}

fn check_age(age: Option<u32>) -> Result<(), NutritionError> {
    match age {
        Some(0) => Err(NutritionError::validation("age", "must be positive")),
        _ => Ok(()),
    }
}

pub async fn create_profile(state: &AppState, new: NewProfile) -> Result<Profile, NutritionError> {
    check_age(Some(new.age))?;
    check_positive("height_cm", Some(new.height_cm))?;
    check_positive("hand_cm", Some(new.hand_cm))?;

    let profile = state.profiles.create_profile(new).await?;
    debug!(profile_id = %profile.id, "profile created");
    Ok(profile)
}

/// Applies a partial card update; the measurement history is untouched.
pub async fn update_profile(
    state: &AppState,
    profile_id: Uuid,
    update: ProfileUpdate,
) -> Result<Profile, NutritionError> {
    check_age(update.age)?;
    check_positive("height_cm", update.height_cm)?;
    check_positive("hand_cm", update.hand_cm)?;

    state
        .profiles
        .update_profile(profile_id, update)
        .await?
        .ok_or_else(|| NutritionError::not_found("profile", profile_id))
}

pub async fn append_measurement(
    state: &AppState,
    profile_id: Uuid,
    new: NewMeasurement,
) -> Result<Measurement, NutritionError> {
    load_profile(state, profile_id).await?;
    check_positive("weight_kg", Some(new.weight_kg))?;
    check_positive("hand_cm", new.hand_cm)?;
    check_positive("chest_cm", new.chest_cm)?;
    check_positive("waist_cm", new.waist_cm)?;
    check_positive("hips_cm", new.hips_cm)?;

    let measurement = state.profiles.append_measurement(profile_id, new).await?;
    debug!(%profile_id, measurement_id = %measurement.id, "measurement appended");
    Ok(measurement)
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Replaces the card blacklist after enforcing its size limits.
pub async fn set_exclusions(
    state: &AppState,
    profile_id: Uuid,
    product_ids: &[i64],
    category_ids: &[i64],
) -> Result<Profile, NutritionError> {
    let product_ids = dedup(product_ids);
    let category_ids = dedup(category_ids);
    if product_ids.len() > MAX_EXCLUDED_PRODUCTS {
        return Err(NutritionError::validation(
            "exclude_products",
            format!("Limit of excluded products {MAX_EXCLUDED_PRODUCTS}"),
        ));
    }
    if category_ids.len() > MAX_EXCLUDED_CATEGORIES {
        return Err(NutritionError::validation(
            "exclude_categories",
            format!("Limit of excluded products categories {MAX_EXCLUDED_CATEGORIES}"),
        ));
    }

    load_profile(state, profile_id).await?;
    state
        .profiles
        .set_exclusions(profile_id, &product_ids, &category_ids)
        .await?;
    load_profile(state, profile_id).await
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use time::{macros::datetime, OffsetDateTime};
    use uuid::Uuid;

    use crate::profiles::repo_types::{ActivityLevel, Gender, NewMeasurement, Profile};
    use crate::store::memory::MemoryStore;

    /// Male, 30 y, 180 cm, hand 19 cm, sedentary.
    pub fn male_profile() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            gender: Gender::Male,
            age: 30,
            height_cm: 180.0,
            hand_cm: 19.0,
            activity: ActivityLevel::Sedentary,
            excluded_products: vec![],
            excluded_categories: vec![],
        }
    }

    pub const MEASURED_AT: OffsetDateTime = datetime!(2024-02-04 08:00 UTC);

    pub fn weighing(weight_kg: f64, taken_at: OffsetDateTime) -> NewMeasurement {
        NewMeasurement {
            weight_kg,
            hand_cm: None,
            chest_cm: None,
            waist_cm: None,
            hips_cm: None,
            taken_at: Some(taken_at),
        }
    }

    /// Store holding the reference profile weighed at 75 kg on 2024-02-04.
    pub async fn seeded_store() -> (Arc<MemoryStore>, Profile) {
        use crate::profiles::repo::ProfileStore;

        let store = Arc::new(MemoryStore::new());
        let profile = male_profile();
        store.insert_profile(profile.clone()).await;
        store
            .append_measurement(profile.id, weighing(75.0, MEASURED_AT))
            .await
            .unwrap();
        (store, profile)
    }
}
