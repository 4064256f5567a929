use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const MAX_EXCLUDED_PRODUCTS: usize = 20;
pub const MAX_EXCLUDED_CATEGORIES: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "male",
            Gender::Female => "female",
        })
    }
}

impl FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => anyhow::bail!("unknown gender {other:?}"),
        }
    }
}

/// Daily activity level; each level carries a fixed energy multiplier.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Sitting or lying most of the day.
    #[default]
    Sedentary,
    MentalWork,
    /// Active work on the feet or 2-3 trainings a week.
    LightPhysical,
    /// Daily trainings.
    ModeratePhysical,
    /// Professional athletes.
    HeavyPhysical,
}

impl ActivityLevel {
    pub fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::MentalWork => 1.375,
            ActivityLevel::LightPhysical => 1.55,
            ActivityLevel::ModeratePhysical => 1.7,
            ActivityLevel::HeavyPhysical => 1.9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::MentalWork => "mental_work",
            ActivityLevel::LightPhysical => "light_physical",
            ActivityLevel::ModeratePhysical => "moderate_physical",
            ActivityLevel::HeavyPhysical => "heavy_physical",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ActivityLevel::Sedentary,
            ActivityLevel::MentalWork,
            ActivityLevel::LightPhysical,
            ActivityLevel::ModeratePhysical,
            ActivityLevel::HeavyPhysical,
        ]
        .into_iter()
        .find(|level| level.as_str() == s)
        .ok_or_else(|| anyhow::anyhow!("unknown activity level {s:?}"))
    }
}

/// A person card: the anthropometric baseline plus the personal blacklist.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub gender: Gender,
    pub age: u32,
    pub height_cm: f64,
    pub hand_cm: f64,
    pub activity: ActivityLevel,
    pub excluded_products: Vec<i64>,
    pub excluded_categories: Vec<i64>,
}

/// Body of a card creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub gender: Gender,
    pub age: u32,
    pub height_cm: f64,
    pub hand_cm: f64,
    #[serde(default)]
    pub activity: ActivityLevel,
}

/// Partial card update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub height_cm: Option<f64>,
    pub hand_cm: Option<f64>,
    pub activity: Option<ActivityLevel>,
}

impl ProfileUpdate {
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(gender) = self.gender {
            profile.gender = gender;
        }
        if let Some(age) = self.age {
            profile.age = age;
        }
        if let Some(height_cm) = self.height_cm {
            profile.height_cm = height_cm;
        }
        if let Some(hand_cm) = self.hand_cm {
            profile.hand_cm = hand_cm;
        }
        if let Some(activity) = self.activity {
            profile.activity = activity;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub weight_kg: f64,
    pub hand_cm: Option<f64>,
    pub chest_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hips_cm: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub taken_at: OffsetDateTime,
}

impl Measurement {
    /// Hand circumference to classify by; the card value is the fallback.
    pub fn effective_hand_cm(&self, profile: &Profile) -> f64 {
        self.hand_cm.unwrap_or(profile.hand_cm)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMeasurement {
    pub weight_kg: f64,
    #[serde(default)]
    pub hand_cm: Option<f64>,
    #[serde(default)]
    pub chest_cm: Option<f64>,
    #[serde(default)]
    pub waist_cm: Option<f64>,
    #[serde(default)]
    pub hips_cm: Option<f64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub taken_at: Option<OffsetDateTime>,
}

#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub gender: String,
    pub age: i32,
    pub height_cm: f64,
    pub hand_cm: f64,
    pub activity: String,
}

impl ProfileRow {
    pub fn into_profile(
        self,
        excluded_products: Vec<i64>,
        excluded_categories: Vec<i64>,
    ) -> anyhow::Result<Profile> {
        Ok(Profile {
            id: self.id,
            gender: self.gender.parse()?,
            age: u32::try_from(self.age)?,
            height_cm: self.height_cm,
            hand_cm: self.hand_cm,
            activity: self.activity.parse()?,
            excluded_products,
            excluded_categories,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct MeasurementRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub weight_kg: f64,
    pub hand_cm: Option<f64>,
    pub chest_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hips_cm: Option<f64>,
    pub taken_at: OffsetDateTime,
}

impl From<MeasurementRow> for Measurement {
    fn from(r: MeasurementRow) -> Self {
        Self {
            id: r.id,
            profile_id: r.profile_id,
            weight_kg: r.weight_kg,
            hand_cm: r.hand_cm,
            chest_cm: r.chest_cm,
            waist_cm: r.waist_cm,
            hips_cm: r.hips_cm,
            taken_at: r.taken_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_levels_parse_from_storage_names() {
        let level: ActivityLevel = "light_physical".parse().unwrap();
        assert_eq!(level, ActivityLevel::LightPhysical);
        assert_eq!(level.multiplier(), 1.55);
        assert!("couch".parse::<ActivityLevel>().is_err());
    }

    #[test]
    fn measurement_hand_overrides_card() {
        let profile = Profile {
            id: Uuid::new_v4(),
            gender: Gender::Female,
            age: 25,
            height_cm: 160.0,
            hand_cm: 15.0,
            activity: ActivityLevel::Sedentary,
            excluded_products: vec![],
            excluded_categories: vec![],
        };
        let mut m = Measurement {
            id: Uuid::new_v4(),
            profile_id: profile.id,
            weight_kg: 60.0,
            hand_cm: None,
            chest_cm: None,
            waist_cm: None,
            hips_cm: None,
            taken_at: OffsetDateTime::now_utc(),
        };
        assert_eq!(m.effective_hand_cm(&profile), 15.0);
        m.hand_cm = Some(16.5);
        assert_eq!(m.effective_hand_cm(&profile), 16.5);
    }

    #[test]
    fn partial_update_touches_only_given_fields() {
        let mut profile = Profile {
            id: Uuid::new_v4(),
            gender: Gender::Male,
            age: 30,
            height_cm: 180.0,
            hand_cm: 19.0,
            activity: ActivityLevel::Sedentary,
            excluded_products: vec![7],
            excluded_categories: vec![],
        };
        let update: ProfileUpdate =
            serde_json::from_str(r#"{"hand_cm": 20.5, "activity": "heavy_physical"}"#).unwrap();
        update.apply(&mut profile);
        assert_eq!(profile.hand_cm, 20.5);
        assert_eq!(profile.activity, ActivityLevel::HeavyPhysical);
        assert_eq!(profile.height_cm, 180.0);
        assert_eq!(profile.age, 30);
        assert_eq!(profile.excluded_products, vec![7]);
    }

    #[test]
    fn new_profile_defaults_to_sedentary() {
        let new: NewProfile =
            serde_json::from_str(r#"{"gender": "female", "age": 25, "height_cm": 160, "hand_cm": 16}"#)
                .unwrap();
        assert_eq!(new.activity, ActivityLevel::Sedentary);
        assert!(serde_json::from_str::<NewProfile>(
            r#"{"gender": "female", "age": 25, "height_cm": 160, "hand_cm": 16, "activity": "couch"}"#
        )
        .is_err());
    }
}
