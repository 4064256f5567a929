use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::repo_types::ProductRecord;
use crate::errors::{http_error, NutritionError};
use crate::state::AppState;

pub const SEARCH_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    #[serde(default)]
    pub title: String,
}

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/products/search", get(search_products))
}

#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    Query(q): Query<TitleQuery>,
) -> Result<Json<Vec<ProductRecord>>, (StatusCode, String)> {
    if q.title.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }
    let products = state
        .catalog
        .search_by_title(q.title.trim(), SEARCH_LIMIT)
        .await
        .map_err(|e| http_error(NutritionError::from(e)))?;
    Ok(Json(products))
}
