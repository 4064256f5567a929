use axum::http::StatusCode;
use thiserror::Error;
use time::Date;
use tracing::error;
use uuid::Uuid;

use crate::profiles::repo_types::Gender;

/// Errors surfaced by the calculation and recommendation pipeline.
#[derive(Debug, Error)]
pub enum NutritionError {
    #[error("Measurements not found for profile {profile_id} on or before {date}")]
    MeasurementNotFound { profile_id: Uuid, date: Date },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("There are too low eating to make recommendations: {eaten} eaten, {required} required")]
    InsufficientData { eaten: usize, required: usize },

    #[error("Hand circumference {hand_cm} cm is outside the {gender} frame brackets")]
    Configuration { gender: Gender, hand_cm: f64 },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl NutritionError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MeasurementNotFound { .. } | Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InsufficientData { .. } | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Configuration { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Maps a domain error onto the `(StatusCode, String)` rejection used by handlers.
pub fn http_error(e: NutritionError) -> (StatusCode, String) {
    let status = e.status();
    if status.is_server_error() {
        error!(error = %e, "request failed");
        (status, "internal error".into())
    } else {
        (status, e.to_string())
    }
}
