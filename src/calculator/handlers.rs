use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::TargetsResponse;
use super::services;
use crate::dto::DateQuery;
use crate::errors::http_error;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/profiles/:id/targets", get(get_targets))
}

#[instrument(skip(state))]
pub async fn get_targets(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    Query(q): Query<DateQuery>,
) -> Result<Json<TargetsResponse>, (StatusCode, String)> {
    let date = q.resolve().map_err(http_error)?;
    let assessment = services::assess(&state, profile_id, date)
        .await
        .map_err(http_error)?;
    Ok(Json(assessment.into()))
}
