use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::RecordedEvent;
use super::repo_types::{NewConsumption, NewRecipe, RecipeVersion};
use super::services::{self, DailyIntake};
use crate::dto::DateQuery;
use crate::errors::http_error;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/profiles/:id/intake", get(get_intake))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles/:id/consumption", post(record_consumption))
        .route(
            "/profiles/:id/consumption/:event_id",
            delete(delete_consumption),
        )
        .route("/profiles/:id/recipes", post(create_recipe))
        .route("/profiles/:id/recipes/:recipe_id", put(revise_recipe))
}

#[instrument(skip(state))]
pub async fn get_intake(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    Query(q): Query<DateQuery>,
) -> Result<Json<DailyIntake>, (StatusCode, String)> {
    let date = q.resolve().map_err(http_error)?;
    let intake = services::current_intake(&state, profile_id, date)
        .await
        .map_err(http_error)?;
    Ok(Json(intake))
}

#[instrument(skip(state))]
pub async fn record_consumption(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    Json(body): Json<NewConsumption>,
) -> Result<(StatusCode, Json<RecordedEvent>), (StatusCode, String)> {
    let id = services::record_consumption(&state, profile_id, body)
        .await
        .map_err(http_error)?;
    Ok((StatusCode::CREATED, Json(RecordedEvent { id })))
}

#[instrument(skip(state))]
pub async fn delete_consumption(
    State(state): State<AppState>,
    Path((profile_id, event_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, (StatusCode, String)> {
    services::delete_consumption(&state, profile_id, event_id)
        .await
        .map_err(http_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn create_recipe(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    Json(body): Json<NewRecipe>,
) -> Result<(StatusCode, Json<RecipeVersion>), (StatusCode, String)> {
    let recipe = services::create_recipe(&state, profile_id, &body)
        .await
        .map_err(http_error)?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[instrument(skip(state))]
pub async fn revise_recipe(
    State(state): State<AppState>,
    Path((profile_id, recipe_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<NewRecipe>,
) -> Result<Json<RecipeVersion>, (StatusCode, String)> {
    let recipe = services::revise_recipe(&state, profile_id, recipe_id, &body)
        .await
        .map_err(http_error)?;
    Ok(Json(recipe))
}
