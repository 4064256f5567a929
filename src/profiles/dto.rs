use serde::{Deserialize, Serialize};

use super::repo_types::Profile;

#[derive(Debug, Deserialize)]
pub struct ExclusionsRequest {
    #[serde(default)]
    pub exclude_products: Vec<i64>,
    #[serde(default)]
    pub exclude_categories: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ExclusionsResponse {
    pub exclude_products: Vec<i64>,
    pub exclude_categories: Vec<i64>,
}

impl From<Profile> for ExclusionsResponse {
    fn from(p: Profile) -> Self {
        Self {
            exclude_products: p.excluded_products,
            exclude_categories: p.excluded_categories,
        }
    }
}
