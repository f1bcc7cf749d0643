use axum::{
    extract::State,
    routing::{get, patch, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::{
    dto::{AvatarRequest, HistoryEntry, HistoryRequest, LikeRequest, MessageResponse, Movie},
    repo::User,
    store,
};
use crate::{auth::jwt::AuthUser, error::ApiError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/profile", get(get_profile))
        .route("/user/profile/avatar", patch(update_avatar))
        .route("/user/like", post(toggle_like))
        .route("/user/history", post(record_search).delete(clear_history))
}

async fn load_user(state: &AppState, user_id: uuid::Uuid) -> Result<User, ApiError> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::Unauthorized("User not found"))
}

/// GET /api/user/profile — the record minus the password hash, which serde
/// strips at the type level.
#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<User>, ApiError> {
    let user = load_user(&state, user_id).await?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<AvatarRequest>,
) -> Result<Json<User>, ApiError> {
    let mut user = load_user(&state, user_id).await?;
    user.avatar = payload.avatar;
    let user = user.save_state(&state.db).await?;
    info!(user_id = %user.id, "avatar updated");
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<LikeRequest>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    let mut user = load_user(&state, user_id).await?;
    store::toggle_like(&mut user.liked_movies, payload.movie);
    let user = user.save_state(&state.db).await?;
    Ok(Json(user.liked_movies))
}

#[instrument(skip(state, payload))]
pub async fn record_search(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<HistoryRequest>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    if payload.query.trim().is_empty() {
        return Err(ApiError::Validation("Query is required".into()));
    }
    let mut user = load_user(&state, user_id).await?;
    store::record_search(
        &mut user.search_history,
        &payload.query,
        OffsetDateTime::now_utc(),
    );
    let user = user.save_state(&state.db).await?;
    Ok(Json(user.search_history))
}

#[instrument(skip(state))]
pub async fn clear_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut user = load_user(&state, user_id).await?;
    user.search_history.clear();
    user.save_state(&state.db).await?;
    info!(user_id = %user_id, "search history cleared");
    Ok(Json(MessageResponse {
        message: "History cleared",
    }))
}
