use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::downloads::{attachment, TEXT_CSV};
use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentRecruiter, CurrentStudent};
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::{normalize_email, optional_filter};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::repositories::students::{CreateStudent, StudentFilter, UpdateStudent};
use crate::schemas::student::{
    ImportResponse, StudentCreate, StudentListQuery, StudentResponse, StudentUpdate,
};
use crate::services::student_csv;

const MAX_IMPORT_BYTES: usize = 5 * 1024 * 1024;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route("/me", get(my_record))
        .route("/courses", get(list_courses))
        .route("/export", get(export_students))
        .route("/import", post(import_students))
        .route("/:student_id", get(get_student).patch(update_student).delete(delete_student))
}

fn filter_from(search: Option<String>, course: Option<String>) -> StudentFilter {
    StudentFilter { search: optional_filter(search), course: optional_filter(course) }
}

async fn list_students(
    Query(params): Query<StudentListQuery>,
    CurrentRecruiter(_viewer): CurrentRecruiter,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<StudentResponse>>, ApiError> {
    let filter = filter_from(params.search, params.course);

    let students =
        repositories::students::list(state.db(), &filter, params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list students"))?;
    let total_count = repositories::students::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count students"))?;

    Ok(Json(PaginatedResponse {
        items: students.into_iter().map(StudentResponse::from_db).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

async fn list_courses(
    CurrentRecruiter(_viewer): CurrentRecruiter,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let courses = repositories::students::distinct_courses(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;
    Ok(Json(courses))
}

async fn my_record(
    CurrentStudent(profile): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = repositories::students::find_by_profile_id(state.db(), &profile.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student record"))?
        .ok_or_else(|| ApiError::NotFound("Student record not found".to_string()))?;

    Ok(Json(StudentResponse::from_db(student)))
}

async fn get_student(
    Path(student_id): Path<String>,
    CurrentRecruiter(_viewer): CurrentRecruiter,
    State(state): State<AppState>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = repositories::students::find_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    Ok(Json(StudentResponse::from_db(student)))
}

async fn create_student(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<StudentCreate>,
) -> Result<(StatusCode, Json<StudentResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let email = normalize_email(&payload.student_email);
    let student = repositories::students::create(
        state.db(),
        CreateStudent {
            id: &Uuid::new_v4().to_string(),
            profile_id: payload.profile_id.as_deref(),
            enrollment_number: payload.enrollment_number.trim(),
            student_name: payload.student_name.trim(),
            student_email: &email,
            student_phone: payload.student_phone.trim(),
            course: payload.course.trim(),
            branch: payload.branch.trim(),
            year_of_study: payload.year_of_study,
            cgpa: payload.cgpa,
            skills: payload.skills,
            placement_status: payload.placement_status.as_deref(),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => ApiError::Conflict(
            "Student with this enrollment number or profile already exists".to_string(),
        ),
        other => ApiError::internal(other, "Failed to create student"),
    })?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student.id,
        enrollment_number = %student.enrollment_number,
        action = "student_create",
        "Admin created student"
    );

    Ok((StatusCode::CREATED, Json(StudentResponse::from_db(student))))
}

async fn update_student(
    Path(student_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<StudentUpdate>,
) -> Result<Json<StudentResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let student = repositories::students::update(
        state.db(),
        &student_id,
        UpdateStudent {
            student_name: payload.student_name.map(|value| value.trim().to_string()),
            student_email: payload.student_email.as_deref().map(normalize_email),
            student_phone: payload.student_phone,
            course: payload.course,
            branch: payload.branch,
            year_of_study: payload.year_of_study,
            cgpa: payload.cgpa,
            skills: payload.skills,
            placement_status: payload.placement_status,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update student"))?
    .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student.id,
        action = "student_update",
        "Admin updated student"
    );

    Ok(Json(StudentResponse::from_db(student)))
}

async fn delete_student(
    Path(student_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::students::delete_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete student"))?;
    if !deleted {
        return Err(ApiError::NotFound("Student not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student_id,
        action = "student_delete",
        "Admin deleted student"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn export_students(
    Query(params): Query<StudentListQuery>,
    CurrentRecruiter(viewer): CurrentRecruiter,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let filter = filter_from(params.search, params.course);
    let students = repositories::students::list_all(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load students for export"))?;

    let body = student_csv::export(&students)
        .map_err(|e| ApiError::internal(e, "Failed to render students CSV"))?;

    tracing::info!(
        profile_id = %viewer.id,
        rows = students.len(),
        action = "student_export",
        "Exported students"
    );

    Ok(attachment(body, TEXT_CSV, student_csv::EXPORT_FILENAME))
}

async fn import_students(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, ApiError> {
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
        {
            if bytes.len() + chunk.len() > MAX_IMPORT_BYTES {
                return Err(ApiError::BadRequest("CSV file exceeds 5MB limit".to_string()));
            }
            bytes.extend_from_slice(&chunk);
        }
        file_bytes = Some(bytes);
    }

    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("CSV file is required".to_string()))?;
    let parsed =
        student_csv::parse_import(&file_bytes).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to begin import transaction"))?;

    let mut imported = 0;
    for row in &parsed.students {
        let email = normalize_email(&row.student_email);
        let inserted = repositories::students::insert_if_absent(
            &mut *tx,
            CreateStudent {
                id: &Uuid::new_v4().to_string(),
                profile_id: None,
                enrollment_number: &row.enrollment_number,
                student_name: &row.student_name,
                student_email: &email,
                student_phone: &row.student_phone,
                course: &row.course,
                branch: &row.branch,
                year_of_study: None,
                cgpa: None,
                skills: Vec::new(),
                placement_status: None,
                created_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to import student"))?;
        if inserted {
            imported += 1;
        }
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit student import"))?;

    let skipped = parsed.students.len() - imported;
    tracing::info!(
        admin_id = %admin.id,
        imported,
        skipped,
        invalid_rows = parsed.invalid_rows,
        action = "student_import",
        "Imported students from CSV"
    );

    Ok(Json(ImportResponse { imported, skipped, invalid_rows: parsed.invalid_rows }))
}

#[cfg(test)]
mod tests;
