use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{patch, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{ExclusionsRequest, ExclusionsResponse};
use super::repo_types::{Measurement, NewMeasurement, NewProfile, Profile, ProfileUpdate};
use super::services;
use crate::errors::http_error;
use crate::state::AppState;

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles", post(create_profile))
        .route("/profiles/:id", patch(update_profile))
        .route("/profiles/:id/measurements", post(append_measurement))
        .route("/profiles/:id/exclusions", put(set_exclusions))
}

#[instrument(skip(state))]
pub async fn create_profile(
    State(state): State<AppState>,
    Json(body): Json<NewProfile>,
) -> Result<(StatusCode, Json<Profile>), (StatusCode, String)> {
    let profile = services::create_profile(&state, body)
        .await
        .map_err(http_error)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[instrument(skip(state))]
pub async fn update_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<Profile>, (StatusCode, String)> {
    let profile = services::update_profile(&state, profile_id, body)
        .await
        .map_err(http_error)?;
    Ok(Json(profile))
}

#[instrument(skip(state))]
pub async fn append_measurement(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    Json(body): Json<NewMeasurement>,
) -> Result<(StatusCode, Json<Measurement>), (StatusCode, String)> {
    let measurement = services::append_measurement(&state, profile_id, body)
        .await
        .map_err(http_error)?;
    Ok((StatusCode::CREATED, Json(measurement)))
}

#[instrument(skip(state))]
pub async fn set_exclusions(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    Json(body): Json<ExclusionsRequest>,
) -> Result<Json<ExclusionsResponse>, (StatusCode, String)> {
    let profile = services::set_exclusions(
        &state,
        profile_id,
        &body.exclude_products,
        &body.exclude_categories,
    )
    .await
    .map_err(http_error)?;
    Ok(Json(profile.into()))
}
