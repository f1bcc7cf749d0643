use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::instrument;

use super::proxy;
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    pub movie: Option<String>,
}

/// GET /api/recommend?movie=Q
///
/// The upstream body is returned as-is, including its own
/// `{error, hint}` shape for unknown titles.
#[instrument(skip(state))]
pub async fn recommend(
    State(state): State<AppState>,
    Query(params): Query<RecommendQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let movie = params
        .movie
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Movie parameter is required".into()))?;

    let value =
        proxy::fetch_recommendations(state.cache.as_ref(), state.recommender.as_ref(), &movie)
            .await?;
    Ok(Json(value))
}
