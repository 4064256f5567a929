use serde::Deserialize;

use super::search::SearchStrategy;
use crate::dto::DateQuery;

#[derive(Debug, Default, Deserialize)]
pub struct IncludeQuery {
    pub date: Option<String>,
    pub strategy: Option<SearchStrategy>,
}

impl IncludeQuery {
    pub fn date_query(&self) -> DateQuery {
        DateQuery {
            date: self.date.clone(),
        }
    }
}
