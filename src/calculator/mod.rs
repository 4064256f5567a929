pub mod anthropometry;
mod dto;
pub mod handlers;
pub mod services;
pub mod targets;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::read_routes())
}
