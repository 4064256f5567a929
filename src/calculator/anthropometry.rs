//! Frame-size classification from hand (wrist) circumference.
//!
//! One set of bracket boundaries per gender drives both the body-type label and the
//! ideal-weight coefficient:
//!
//! | gender | narrow frame | medium frame     | broad frame |
//! |--------|--------------|------------------|-------------|
//! | male   | hand < 18    | 18 <= hand <= 20 | hand > 20   |
//! | female | hand < 16    | 16 <= hand <= 17 | hand > 17   |

use serde::Serialize;

use crate::errors::NutritionError;
use crate::profiles::repo_types::Gender;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    Ectomorph,
    Mesomorph,
    Endomorph,
}

/// Inclusive bounds of the medium-frame bracket, in cm.
fn medium_frame_bounds(gender: Gender) -> (f64, f64) {
    match gender {
        Gender::Male => (18.0, 20.0),
        Gender::Female => (16.0, 17.0),
    }
}

/// Classifies the frame. Fails when the circumference lands in no bracket (NaN).
pub fn classify_frame(gender: Gender, hand_cm: f64) -> Result<BodyType, NutritionError> {
    let (lower, upper) = medium_frame_bounds(gender);
    if hand_cm < lower {
        Ok(BodyType::Ectomorph)
    } else if (lower..=upper).contains(&hand_cm) {
        Ok(BodyType::Mesomorph)
    } else if hand_cm > upper {
        Ok(BodyType::Endomorph)
    } else {
        Err(NutritionError::Configuration { gender, hand_cm })
    }
}

fn ideal_weight_coefficient(gender: Gender, body_type: BodyType) -> f64 {
    match (gender, body_type) {
        (Gender::Male, BodyType::Ectomorph) => 0.375,
        (Gender::Male, BodyType::Mesomorph) => 0.39,
        (Gender::Male, BodyType::Endomorph) => 0.41,
        (Gender::Female, BodyType::Ectomorph) => 0.325,
        (Gender::Female, BodyType::Mesomorph) => 0.34,
        (Gender::Female, BodyType::Endomorph) => 0.355,
    }
}

/// Frame-adjusted reference weight (kg) used by the calorie formulas.
pub fn ideal_weight(gender: Gender, hand_cm: f64, height_cm: f64) -> Result<f64, NutritionError> {
    let body_type = classify_frame(gender, hand_cm)?;
    Ok(height_cm * ideal_weight_coefficient(gender, body_type))
}

/// Body-mass index rounded half-to-even to one decimal.
pub fn body_mass_index(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    (weight_kg / (height_m * height_m) * 10.0).round_ties_even() / 10.0
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BodyComposition {
    #[serde(rename = "type")]
    pub body_type: BodyType,
    #[serde(rename = "value")]
    pub bmi: f64,
}

pub fn body_composition(
    gender: Gender,
    hand_cm: f64,
    weight_kg: f64,
    height_cm: f64,
) -> Result<BodyComposition, NutritionError> {
    Ok(BodyComposition {
        body_type: classify_frame(gender, hand_cm)?,
        bmi: body_mass_index(weight_kg, height_cm),
    })
}
