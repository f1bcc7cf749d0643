use axum::Router;

use crate::state::AppState;

mod dto;
mod handlers;
pub mod jwt;
pub mod password;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
