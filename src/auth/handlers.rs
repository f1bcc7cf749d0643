use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        password,
    },
    error::ApiError,
    state::AppState,
    users::repo::User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Which unique field the colliding record was found on. Email wins when
/// both collide, so a duplicate email always reports as an email conflict
/// no matter what username was submitted.
fn conflict_field(existing: &User, email: &str) -> &'static str {
    if existing.email == email {
        "Email"
    } else {
        "Username"
    }
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if payload.username.is_empty() {
        return Err(ApiError::Validation("Username is required".into()));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    // One combined lookup covers both uniqueness checks.
    if let Some(existing) =
        User::find_by_username_or_email(&state.db, &payload.username, &payload.email).await?
    {
        let field = conflict_field(&existing, &payload.email);
        warn!(field, "registration conflict");
        return Err(ApiError::Conflict(field));
    }

    // Only the hash ever reaches storage; the plaintext is dropped here.
    let hash = password::hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.username, &payload.email, &hash).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password must be indistinguishable to the
    // caller; both exit through InvalidCredentials.
    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!("login with unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !password::verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn stored_user(username: &str, email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: "$argon2id$irrelevant".into(),
            avatar: String::new(),
            liked_movies: vec![],
            search_history: vec![],
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn duplicate_email_conflicts_regardless_of_username() {
        // The second registration reuses the email under a fresh username;
        // the combined lookup still finds the record and it must be
        // reported as an email conflict.
        let existing = stored_user("ada", "ada@example.com");
        assert_eq!(conflict_field(&existing, "ada@example.com"), "Email");

        let existing = stored_user("completely-different", "ada@example.com");
        assert_eq!(conflict_field(&existing, "ada@example.com"), "Email");
    }

    #[test]
    fn duplicate_username_with_new_email_conflicts_on_username() {
        let existing = stored_user("ada", "ada@example.com");
        assert_eq!(conflict_field(&existing, "fresh@example.com"), "Username");
    }

    #[test]
    fn colliding_on_both_fields_reports_email() {
        let existing = stored_user("ada", "ada@example.com");
        assert_eq!(conflict_field(&existing, "ada@example.com"), "Email");
    }

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.io"));
    }

    #[test]
    fn email_regex_rejects_junk() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }
}
