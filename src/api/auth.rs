use axum::{
    extract::{Form, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::normalize_email;
use crate::core::security;
use crate::core::state::AppState;
use crate::db::models::Profile;
use crate::repositories;
use crate::schemas::auth::{LoginRequest, TokenResponse};
use crate::schemas::user::ProfileResponse;

/// Max attempts per window for login endpoints.
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Deserialize)]
struct OAuth2PasswordForm {
    username: String,
    password: String,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/token", post(token))
        .route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    authenticate(&state, &payload.email, &payload.password, "login").await.map(Json)
}

/// OAuth2 password flow for tooling; `username` carries the email.
async fn token(
    State(state): State<AppState>,
    Form(payload): Form<OAuth2PasswordForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    authenticate(&state, &payload.username, &payload.password, "token").await.map(Json)
}

async fn me(CurrentUser(profile): CurrentUser) -> Json<ProfileResponse> {
    Json(ProfileResponse::from_db(profile))
}

async fn authenticate(
    state: &AppState,
    email: &str,
    password: &str,
    flow: &str,
) -> Result<TokenResponse, ApiError> {
    let email = normalize_email(email);

    let rate_key = format!("rl:{flow}:{email}");
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let profile = fetch_profile_by_email(state, &email).await?;

    let verified = security::verify_password(password, &profile.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect email or password"))?;

    if !verified {
        return Err(ApiError::Unauthorized("Incorrect email or password"));
    }

    if !profile.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    let token = security::create_access_token(&profile.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    tracing::info!(profile_id = %profile.id, role = ?profile.role, "User logged in");

    Ok(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: ProfileResponse::from_db(profile),
    })
}

async fn fetch_profile_by_email(state: &AppState, email: &str) -> Result<Profile, ApiError> {
    repositories::profiles::find_by_email(state.db(), email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load profile"))?
        .ok_or(ApiError::Unauthorized("Incorrect email or password"))
}
