use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::{normalize_email, optional_filter};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::user::{ProfileCreate, ProfileListQuery, ProfileResponse, ProfileUpdate};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_profiles).post(create_profile))
        .route("/me", get(me))
        .route("/:profile_id", get(get_profile).patch(update_profile).delete(delete_profile))
}

async fn me(CurrentUser(profile): CurrentUser) -> Json<ProfileResponse> {
    Json(ProfileResponse::from_db(profile))
}

async fn list_profiles(
    Query(params): Query<ProfileListQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ProfileResponse>>, ApiError> {
    let search = optional_filter(params.search);

    let profiles = repositories::profiles::list(
        state.db(),
        params.role,
        search.as_deref(),
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list users"))?;

    let total_count = repositories::profiles::count(state.db(), params.role, search.as_deref())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count users"))?;

    Ok(Json(PaginatedResponse {
        items: profiles.into_iter().map(ProfileResponse::from_db).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

async fn get_profile(
    Path(profile_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = repositories::profiles::find_by_id(state.db(), &profile_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse::from_db(profile)))
}

async fn create_profile(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ProfileCreate>,
) -> Result<(StatusCode, Json<ProfileResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let email = normalize_email(&payload.email);
    let existing = repositories::profiles::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let profile = repositories::profiles::create(
        state.db(),
        repositories::profiles::CreateProfile {
            id: &Uuid::new_v4().to_string(),
            email: &email,
            full_name: payload.full_name.trim(),
            role: payload.role,
            organization_id: payload.organization_id.as_deref(),
            phone: payload.phone.as_deref(),
            hashed_password,
            is_active: payload.is_active,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    tracing::info!(
        admin_id = %admin.id,
        profile_id = %profile.id,
        role = ?profile.role,
        action = "user_create",
        "Admin created user"
    );

    Ok((StatusCode::CREATED, Json(ProfileResponse::from_db(profile))))
}

async fn update_profile(
    Path(profile_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if profile_id == admin.id && payload.is_active == Some(false) {
        return Err(ApiError::BadRequest("You cannot deactivate your own account".to_string()));
    }

    let hashed_password = payload
        .password
        .as_deref()
        .map(security::hash_password)
        .transpose()
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let updated = repositories::profiles::update(
        state.db(),
        &profile_id,
        repositories::profiles::UpdateProfile {
            full_name: payload.full_name.map(|name| name.trim().to_string()),
            role: payload.role,
            organization_id: payload.organization_id,
            phone: payload.phone,
            hashed_password,
            is_active: payload.is_active,
            preferences: payload.preferences,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update user"))?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        profile_id = %updated.id,
        action = "user_update",
        "Admin updated user"
    );

    Ok(Json(ProfileResponse::from_db(updated)))
}

async fn delete_profile(
    Path(profile_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if profile_id == admin.id {
        return Err(ApiError::BadRequest("You cannot delete your own account".to_string()));
    }

    let deleted = repositories::profiles::delete_by_id(state.db(), &profile_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete user"))?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        profile_id = %profile_id,
        action = "user_delete",
        "Admin deleted user"
    );

    Ok(StatusCode::NO_CONTENT)
}
