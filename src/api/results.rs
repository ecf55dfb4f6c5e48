use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, patch},
    Json, Router,
};

use crate::api::downloads::{attachment, TEXT_PLAIN};
use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentRecruiter, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::optional_filter;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Profile;
use crate::db::types::{ResultStatus, UserRole};
use crate::repositories;
use crate::repositories::results::{ResultFilter, ResultRow, ResultSort};
use crate::schemas::result::{ResultListQuery, ResultResponse, StatusUpdateRequest};
use crate::services::reports::{self, ReportSubject};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_results))
        .route("/report", get(download_all_results))
        .route("/:result_id", get(get_result))
        .route("/:result_id/report", get(download_review))
        .route("/:result_id/student-report", get(download_student_report))
        .route("/:result_id/status", patch(update_status))
}

fn parse_status(value: Option<&str>) -> Result<Option<ResultStatus>, ApiError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None | Some("all") => Ok(None),
        Some("pass") => Ok(Some(ResultStatus::Pass)),
        Some("fail") => Ok(Some(ResultStatus::Fail)),
        Some("under-review" | "under_review") => Ok(Some(ResultStatus::UnderReview)),
        Some(other) => Err(ApiError::BadRequest(format!("Unknown status filter: {other}"))),
    }
}

fn parse_sort(value: Option<&str>) -> Result<ResultSort, ApiError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None | Some("date") => Ok(ResultSort::Date),
        Some("score") => Ok(ResultSort::Score),
        Some("percentage") => Ok(ResultSort::Percentage),
        Some(other) => Err(ApiError::BadRequest(format!("Unknown sort order: {other}"))),
    }
}

/// Students see their own results, recruiters the results of tests they
/// authored, administrators everything.
fn scoped_filter(profile: &Profile, params: &ResultListQuery) -> Result<ResultFilter, ApiError> {
    let mut filter = ResultFilter {
        search: optional_filter(params.search.clone()),
        status: parse_status(params.status.as_deref())?,
        test_id: optional_filter(params.test_id.clone()),
        ..ResultFilter::default()
    };
    if profile.role == UserRole::Student {
        filter.student_id = Some(profile.id.clone());
    } else if !profile.role.is_admin() {
        filter.test_author = Some(profile.id.clone());
    }
    Ok(filter)
}

async fn fetch_visible_row(
    state: &AppState,
    profile: &Profile,
    result_id: &str,
) -> Result<ResultRow, ApiError> {
    let row = repositories::results::find_row_by_id(state.db(), result_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch result"))?
        .ok_or_else(|| ApiError::NotFound("Result not found".to_string()))?;

    let visible = if profile.role == UserRole::Student {
        row.result.student_id.as_deref() == Some(profile.id.as_str())
    } else if profile.role.is_admin() {
        true
    } else {
        let test = match row.result.test_id.as_deref() {
            Some(test_id) => repositories::tests::find_by_id(state.db(), test_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch test"))?,
            None => None,
        };
        test.is_some_and(|test| test.created_by.as_deref() == Some(profile.id.as_str()))
    };

    if !visible {
        return Err(ApiError::Forbidden("Access denied"));
    }
    Ok(row)
}

async fn list_results(
    Query(params): Query<ResultListQuery>,
    CurrentUser(profile): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ResultResponse>>, ApiError> {
    let filter = scoped_filter(&profile, &params)?;
    let sort = parse_sort(params.sort.as_deref())?;

    let rows = repositories::results::list(state.db(), &filter, sort, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list results"))?;
    let total_count = repositories::results::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count results"))?;

    Ok(Json(PaginatedResponse {
        items: rows.into_iter().map(ResultResponse::from_row).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

async fn get_result(
    Path(result_id): Path<String>,
    CurrentUser(profile): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ResultResponse>, ApiError> {
    let row = fetch_visible_row(&state, &profile, &result_id).await?;
    Ok(Json(ResultResponse::from_row(row)))
}

async fn download_all_results(
    Query(params): Query<ResultListQuery>,
    CurrentRecruiter(author): CurrentRecruiter,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let filter = scoped_filter(&author, &params)?;
    let sort = parse_sort(params.sort.as_deref())?;

    let rows = repositories::results::list_all(state.db(), &filter, sort)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list results"))?;

    let now = primitive_now_utc();
    tracing::info!(
        author_id = %author.id,
        results = rows.len(),
        action = "results_report",
        "All-results report generated"
    );

    Ok(attachment(
        reports::render_all_results(&rows, now),
        TEXT_PLAIN,
        &reports::all_results_filename(now),
    ))
}

async fn download_review(
    Path(result_id): Path<String>,
    CurrentUser(profile): CurrentUser,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let row = fetch_visible_row(&state, &profile, &result_id).await?;
    let now = primitive_now_utc();

    Ok(attachment(
        reports::render_review(&row.result, now),
        TEXT_PLAIN,
        &reports::review_filename(now),
    ))
}

async fn download_student_report(
    Path(result_id): Path<String>,
    CurrentRecruiter(author): CurrentRecruiter,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let row = fetch_visible_row(&state, &author, &result_id).await?;

    let student = match row.result.student_id.as_deref() {
        Some(student_id) => repositories::profiles::find_by_id(state.db(), student_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch student profile"))?,
        None => None,
    };
    let test = match row.result.test_id.as_deref() {
        Some(test_id) => repositories::tests::find_by_id(state.db(), test_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch test"))?,
        None => None,
    };

    let subject = ReportSubject {
        student_name: row.student_name.as_deref(),
        enrollment_number: row.enrollment_number.as_deref(),
        student_email: student.as_ref().map(|profile| profile.email.as_str()),
        test_title: row.test_title.as_deref(),
        company_name: test
            .as_ref()
            .map(|test| test.company_name.as_str())
            .filter(|name| !name.is_empty()),
    };

    let now = primitive_now_utc();
    Ok(attachment(
        reports::render_student_report(&row.result, &subject, now),
        TEXT_PLAIN,
        &reports::student_report_filename(row.enrollment_number.as_deref(), now),
    ))
}

async fn update_status(
    Path(result_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<ResultResponse>, ApiError> {
    let updated = repositories::results::update_status(state.db(), &result_id, payload.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update result status"))?;
    if !updated {
        return Err(ApiError::NotFound("Result not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        result_id = %result_id,
        status = payload.status.as_str(),
        action = "result_status_update",
        "Result status updated"
    );

    let row = fetch_visible_row(&state, &admin, &result_id).await?;
    Ok(Json(ResultResponse::from_row(row)))
}
