mod dto;
pub mod gaps;
pub mod handlers;
pub mod search;
pub mod services;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::read_routes())
}
