use axum::{routing::get, Router};

use crate::state::AppState;

mod handlers;
pub mod proxy;
pub mod upstream;

pub fn router() -> Router<AppState> {
    Router::new().route("/recommend", get(handlers::recommend))
}
