use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::IncludeQuery;
use super::services::{self, IncludeRecommendation};
use crate::catalog::repo_types::ProductRecord;
use crate::dto::DateQuery;
use crate::errors::http_error;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles/:id/recommendations/include", get(include_products))
        .route("/profiles/:id/recommendations/exclude", get(exclude_product))
}

#[instrument(skip(state))]
pub async fn include_products(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    Query(q): Query<IncludeQuery>,
) -> Result<Json<IncludeRecommendation>, (StatusCode, String)> {
    let date = q.date_query().resolve().map_err(http_error)?;
    let recommendation = services::include_products(&state, profile_id, date, q.strategy)
        .await
        .map_err(http_error)?;
    Ok(Json(recommendation))
}

#[instrument(skip(state))]
pub async fn exclude_product(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    Query(q): Query<DateQuery>,
) -> Result<Json<ProductRecord>, (StatusCode, String)> {
    let date = q.resolve().map_err(http_error)?;
    let product = services::exclude_product(&state, profile_id, date)
        .await
        .map_err(http_error)?;
    Ok(Json(product))
}
