use serde::Serialize;
use time::Date;
use tracing::debug;
use uuid::Uuid;

use super::anthropometry::{body_composition, ideal_weight, BodyComposition};
use super::targets::{daily_targets, DailyNutrients, EnergyInputs};
use crate::errors::NutritionError;
use crate::profiles::repo_types::{Measurement, Profile};
use crate::profiles::services::{current_measurement, load_profile};
use crate::state::AppState;

/// Body composition and daily targets derived from one measurement.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Assessment {
    pub body: BodyComposition,
    pub ideal_weight_kg: f64,
    pub targets: DailyNutrients,
}

pub fn assess_measurement(
    profile: &Profile,
    measurement: &Measurement,
) -> Result<Assessment, NutritionError> {
    let hand_cm = measurement.effective_hand_cm(profile);
    let ideal_weight_kg = ideal_weight(profile.gender, hand_cm, profile.height_cm)?;
    let body = body_composition(
        profile.gender,
        hand_cm,
        measurement.weight_kg,
        profile.height_cm,
    )?;
    let inputs = EnergyInputs {
        gender: profile.gender,
        ideal_weight_kg,
        height_cm: profile.height_cm,
        age: profile.age,
    };
    let targets = daily_targets(&inputs, measurement.weight_kg, profile.activity);

    Ok(Assessment {
        body,
        ideal_weight_kg,
        targets,
    })
}

/// Targets for `date`, using the latest measurement taken on or before it.
pub async fn assess(
    state: &AppState,
    profile_id: Uuid,
    date: Date,
) -> Result<Assessment, NutritionError> {
    let profile = load_profile(state, profile_id).await?;
    let measurement = current_measurement(state, profile_id, date).await?;
    let assessment = assess_measurement(&profile, &measurement)?;
    debug!(
        %profile_id,
        %date,
        body_type = ?assessment.body.body_type,
        calories = assessment.targets.calories,
        "targets computed"
    );
    Ok(assessment)
}
