use serde::Serialize;

use super::anthropometry::BodyComposition;
use super::services::Assessment;
use super::targets::DailyNutrients;

#[derive(Debug, Serialize)]
pub struct TargetsResponse {
    #[serde(flatten)]
    pub targets: DailyNutrients,
    pub body: BodyComposition,
    pub ideal_weight_kg: f64,
}

impl From<Assessment> for TargetsResponse {
    fn from(a: Assessment) -> Self {
        Self {
            targets: a.targets,
            body: a.body,
            ideal_weight_kg: a.ideal_weight_kg,
        }
    }
}
