use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentRecruiter, CurrentStudent};
use crate::core::state::AppState;
use crate::schemas::analytics::{
    AdminDashboard, PlatformAnalytics, RecruiterDashboard, StudentDashboard,
};
use crate::services::analytics;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin_dashboard))
        .route("/recruiter", get(recruiter_dashboard))
        .route("/student", get(student_dashboard))
        .route("/platform", get(platform_analytics))
}

async fn admin_dashboard(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboard>, ApiError> {
    let dashboard = analytics::admin_dashboard(&state)
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to build admin dashboard"))?;
    Ok(Json(dashboard))
}

async fn recruiter_dashboard(
    CurrentRecruiter(recruiter): CurrentRecruiter,
    State(state): State<AppState>,
) -> Result<Json<RecruiterDashboard>, ApiError> {
    let dashboard = analytics::recruiter_dashboard(&state, &recruiter.id)
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to build recruiter dashboard"))?;
    Ok(Json(dashboard))
}

async fn student_dashboard(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StudentDashboard>, ApiError> {
    let dashboard = analytics::student_dashboard(&state, &student.id)
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to build student dashboard"))?;
    Ok(Json(dashboard))
}

async fn platform_analytics(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PlatformAnalytics>, ApiError> {
    let analytics = analytics::platform_analytics(&state)
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to build platform analytics"))?;
    Ok(Json(analytics))
}
