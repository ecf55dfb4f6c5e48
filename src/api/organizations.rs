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
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::organization::{
    OrganizationCreate, OrganizationListQuery, OrganizationResponse, OrganizationUpdate,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_organizations).post(create_organization))
        .route(
            "/:organization_id",
            get(get_organization).patch(update_organization).delete(delete_organization),
        )
}

async fn list_organizations(
    Query(params): Query<OrganizationListQuery>,
    CurrentUser(_profile): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrganizationResponse>>, ApiError> {
    let organizations =
        repositories::organizations::list(state.db(), params.org_type, params.active)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list organizations"))?;

    Ok(Json(organizations.into_iter().map(OrganizationResponse::from_db).collect()))
}

async fn get_organization(
    Path(organization_id): Path<String>,
    CurrentUser(_profile): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let organization = repositories::organizations::find_by_id(state.db(), &organization_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch organization"))?
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    Ok(Json(OrganizationResponse::from_db(organization)))
}

async fn create_organization(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<OrganizationCreate>,
) -> Result<(StatusCode, Json<OrganizationResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let organization = repositories::organizations::create(
        state.db(),
        repositories::organizations::CreateOrganization {
            id: &Uuid::new_v4().to_string(),
            name: payload.name.trim(),
            org_type: payload.org_type,
            domain: payload.domain.as_deref(),
            contact_email: payload.contact_email.as_deref(),
            contact_phone: payload.contact_phone.as_deref(),
            address: payload.address,
            settings: payload.settings,
            is_active: true,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create organization"))?;

    tracing::info!(
        admin_id = %admin.id,
        organization_id = %organization.id,
        action = "organization_create",
        "Admin created organization"
    );

    Ok((StatusCode::CREATED, Json(OrganizationResponse::from_db(organization))))
}

async fn update_organization(
    Path(organization_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<OrganizationUpdate>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let organization = repositories::organizations::update(
        state.db(),
        &organization_id,
        repositories::organizations::UpdateOrganization {
            name: payload.name.map(|name| name.trim().to_string()),
            domain: payload.domain,
            contact_email: payload.contact_email,
            contact_phone: payload.contact_phone,
            address: payload.address,
            settings: payload.settings,
            is_active: payload.is_active,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update organization"))?
    .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        organization_id = %organization.id,
        action = "organization_update",
        "Admin updated organization"
    );

    Ok(Json(OrganizationResponse::from_db(organization)))
}

async fn delete_organization(
    Path(organization_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::organizations::delete_by_id(state.db(), &organization_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete organization"))?;
    if !deleted {
        return Err(ApiError::NotFound("Organization not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        organization_id = %organization_id,
        action = "organization_delete",
        "Admin deleted organization"
    );

    Ok(StatusCode::NO_CONTENT)
}
