use serde::Deserialize;
use time::{macros::format_description, Date, OffsetDateTime};

use crate::errors::NutritionError;

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

impl DateQuery {
    /// `YYYY-MM-DD`, or today (UTC) when absent.
    pub fn resolve(&self) -> Result<Date, NutritionError> {
        match self.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Date::parse(raw, format_description!("[year]-[month]-[day]"))
                .map_err(|_| NutritionError::validation("date", "Invalid date format")),
            None => Ok(OffsetDateTime::now_utc().date()),
        }
    }
}
