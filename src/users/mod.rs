use axum::Router;

use crate::state::AppState;

pub mod dto;
mod handlers;
pub mod repo;
pub mod store;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
