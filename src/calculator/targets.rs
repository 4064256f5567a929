//! Daily calorie, macronutrient and water targets.
//!
//! The calorie estimate blends four resting-energy formulas evaluated on the ideal
//! weight, then adds a 10% buffer and scales by the activity multiplier. Macro targets
//! are fixed shares of the unscaled blend; the gram divisors are tuned values and differ
//! from the generic 4/9/4 kcal per gram.

use serde::Serialize;

use crate::profiles::repo_types::{ActivityLevel, Gender};

const CALORIE_BUFFER: f64 = 0.1;
const PROTEIN_SHARE: f64 = 0.14;
const PROTEIN_KCAL_PER_G: f64 = 3.8;
const FAT_SHARE: f64 = 0.30;
const FAT_KCAL_PER_G: f64 = 9.3;
const CARBOHYDRATE_SHARE: f64 = 0.56;
const CARBOHYDRATE_KCAL_PER_G: f64 = 4.1;
const WATER_ML_PER_KG: f64 = 30.0;

/// The five tracked daily quantities: kcal, grams of each macro, ml of water.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct DailyNutrients {
    pub calories: i64,
    pub proteins: i64,
    pub fats: i64,
    pub carbohydrates: i64,
    pub water: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct EnergyInputs {
    pub gender: Gender,
    pub ideal_weight_kg: f64,
    pub height_cm: f64,
    pub age: u32,
}

/// The four independent estimates, each in kcal/day.
pub fn calorie_terms(inputs: &EnergyInputs) -> [f64; 4] {
    let w = inputs.ideal_weight_kg;
    let h = inputs.height_cm;
    let a = f64::from(inputs.age);
    match inputs.gender {
        Gender::Male => [
            10.0 * w + 6.25 * h - 5.0 * a + 5.0,
            w * 24.0,
            21.3 * w + 370.0,
            66.5 + 13.7 * w + 5.0 * h - 6.8 * a,
        ],
        Gender::Female => [
            10.0 * w + 6.25 * h - 5.0 * a - 161.0,
            w * 24.0,
            21.3 * w + 370.0,
            447.6 + 9.2 * w + 3.1 * h - 4.3 * a,
        ],
    }
}

/// Arithmetic mean of the four estimates.
pub fn blended_calories(inputs: &EnergyInputs) -> f64 {
    calorie_terms(inputs).iter().sum::<f64>() / 4.0
}

pub(crate) fn round_half_even(value: f64) -> i64 {
    value.round_ties_even() as i64
}

pub fn daily_targets(
    inputs: &EnergyInputs,
    weight_kg: f64,
    activity: ActivityLevel,
) -> DailyNutrients {
    let calories = blended_calories(inputs);
    let total = (calories + calories * CALORIE_BUFFER) * activity.multiplier();

    DailyNutrients {
        calories: round_half_even(total),
        proteins: round_half_even(calories * PROTEIN_SHARE / PROTEIN_KCAL_PER_G),
        fats: round_half_even(calories * FAT_SHARE / FAT_KCAL_PER_G),
        carbohydrates: round_half_even(calories * CARBOHYDRATE_SHARE / CARBOHYDRATE_KCAL_PER_G),
        water: round_half_even(weight_kg * WATER_ML_PER_KG),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn male_reference() -> EnergyInputs {
        EnergyInputs {
            gender: Gender::Male,
            ideal_weight_kg: 180.0 * 0.39,
            height_cm: 180.0,
            age: 30,
        }
    }

    #[test]
    fn male_reference_targets() {
        let t = daily_targets(&male_reference(), 75.0, ActivityLevel::Sedentary);
        assert_eq!(
            t,
            DailyNutrients {
                calories: 2296,
                proteins: 64,
                fats: 56,
                carbohydrates: 238,
                water: 2250,
            }
        );
    }

    #[test]
    fn female_reference_targets() {
        let inputs = EnergyInputs {
            gender: Gender::Female,
            ideal_weight_kg: 160.0 * 0.34,
            height_cm: 160.0,
            age: 25,
        };
        let t = daily_targets(&inputs, 60.0, ActivityLevel::LightPhysical);
        assert_eq!(t.calories, 2314);
        assert_eq!(t.proteins, 50);
        assert_eq!(t.fats, 44);
        assert_eq!(t.carbohydrates, 185);
        assert_eq!(t.water, 1800);
    }

    #[test]
    fn blend_is_independent_of_term_order() {
        let terms = calorie_terms(&male_reference());
        let forward = round_half_even(terms.iter().sum::<f64>() / 4.0);
        let backward = round_half_even(terms.iter().rev().sum::<f64>() / 4.0);
        let shuffled = round_half_even((terms[2] + terms[0] + terms[3] + terms[1]) / 4.0);
        assert_eq!(forward, backward);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn all_four_terms_contribute() {
        let terms = calorie_terms(&male_reference());
        assert!(terms.iter().all(|t| *t > 0.0));
        let distinct = terms
            .iter()
            .enumerate()
            .all(|(i, a)| terms.iter().skip(i + 1).all(|b| (a - b).abs() > 1.0));
        assert!(distinct);
    }

    #[test]
    fn water_scales_linearly_with_weight() {
        let inputs = male_reference();
        let single = daily_targets(&inputs, 41.0, ActivityLevel::Sedentary).water;
        let double = daily_targets(&inputs, 82.0, ActivityLevel::Sedentary).water;
        assert_eq!(double, 2 * single);
    }

    #[test]
    fn activity_scales_calories_only() {
        let inputs = male_reference();
        let low = daily_targets(&inputs, 75.0, ActivityLevel::Sedentary);
        let high = daily_targets(&inputs, 75.0, ActivityLevel::HeavyPhysical);
        assert!(high.calories > low.calories);
        assert_eq!(high.proteins, low.proteins);
        assert_eq!(high.fats, low.fats);
        assert_eq!(high.carbohydrates, low.carbohydrates);
    }

    #[test]
    fn macro_targets_are_non_negative() {
        for age in [18, 40, 80] {
            let inputs = EnergyInputs { age, ..male_reference() };
            let t = daily_targets(&inputs, 75.0, ActivityLevel::Sedentary);
            assert!(t.proteins >= 0 && t.fats >= 0 && t.carbohydrates >= 0);
        }
    }
}
