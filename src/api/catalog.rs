use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentRecruiter, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::api::questions::ensure_author;
use crate::api::validation::{optional_filter, validate_question_shape};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Profile, Test, TestQuestion};
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::tests::{CreateTest, TestFilter, UpdateTest};
use crate::schemas::test::{TestCreate, TestListQuery, TestResponse, TestUpdate};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tests).post(create_test))
        .route("/:test_id", get(get_test).patch(update_test).delete(delete_test))
        .route("/:test_id/toggle-active", post(toggle_active))
}

fn can_see_answers(profile: &Profile, test: &Test) -> bool {
    profile.role.is_admin() || test.created_by.as_deref() == Some(profile.id.as_str())
}

async fn fetch_test(state: &AppState, test_id: &str) -> Result<Test, ApiError> {
    repositories::tests::find_by_id(state.db(), test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch test"))?
        .ok_or_else(|| ApiError::NotFound("Test not found".to_string()))
}

/// Validates inline questions, copies bank questions by id, and returns the
/// combined list in order: inline first, then bank questions.
async fn assemble_questions(
    state: &AppState,
    inline: Vec<TestQuestion>,
    question_ids: &[String],
) -> Result<Vec<TestQuestion>, ApiError> {
    let mut questions = Vec::with_capacity(inline.len() + question_ids.len());

    for mut question in inline {
        if question.question_text.trim().is_empty() {
            return Err(ApiError::BadRequest("Question text must not be empty".to_string()));
        }
        validate_question_shape(
            question.question_type,
            &question.options,
            question.correct_answer.as_ref(),
            question.marks,
        )?;
        if question.id.trim().is_empty() {
            question.id = Uuid::new_v4().to_string();
        }
        questions.push(question);
    }

    if !question_ids.is_empty() {
        let bank = repositories::questions::find_by_ids(state.db(), question_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load bank questions"))?;
        if bank.len() != question_ids.len() {
            return Err(ApiError::BadRequest(
                "One or more question ids do not exist".to_string(),
            ));
        }
        questions.extend(bank.iter().map(TestQuestion::from));
    }

    if questions.is_empty() {
        return Err(ApiError::BadRequest("A test needs at least one question".to_string()));
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = questions.iter().find(|question| !seen.insert(question.id.as_str())) {
        return Err(ApiError::BadRequest(format!("Duplicate question id: {}", duplicate.id)));
    }

    Ok(questions)
}

fn resolve_passing_marks(
    state: &AppState,
    requested: Option<f64>,
    total_marks: f64,
) -> Result<f64, ApiError> {
    match requested {
        Some(marks) if !(0.0..=total_marks).contains(&marks) => Err(ApiError::BadRequest(
            format!("passing_marks must be between 0 and {total_marks}"),
        )),
        Some(marks) => Ok(marks),
        None => Ok(total_marks * state.settings().exam().pass_percentage / 100.0),
    }
}

async fn list_tests(
    Query(params): Query<TestListQuery>,
    CurrentUser(profile): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<TestResponse>>, ApiError> {
    let filter = TestFilter {
        active_only: profile.role == UserRole::Student,
        created_by: (params.mine && profile.role.is_author()).then(|| profile.id.clone()),
        search: optional_filter(params.search),
    };

    let tests = repositories::tests::list(state.db(), &filter, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list tests"))?;
    let total_count = repositories::tests::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count tests"))?;

    let items = tests
        .into_iter()
        .map(|test| {
            let reveal = can_see_answers(&profile, &test);
            TestResponse::from_db(test, reveal)
        })
        .collect();

    Ok(Json(PaginatedResponse { items, total_count, skip: params.skip, limit: params.limit }))
}

async fn get_test(
    Path(test_id): Path<String>,
    CurrentUser(profile): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<TestResponse>, ApiError> {
    let test = fetch_test(&state, &test_id).await?;
    if profile.role == UserRole::Student && !test.is_active {
        return Err(ApiError::NotFound("Test not found".to_string()));
    }

    let reveal = can_see_answers(&profile, &test);
    Ok(Json(TestResponse::from_db(test, reveal)))
}

async fn create_test(
    CurrentRecruiter(author): CurrentRecruiter,
    State(state): State<AppState>,
    Json(payload): Json<TestCreate>,
) -> Result<(StatusCode, Json<TestResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let questions = assemble_questions(&state, payload.questions, &payload.question_ids).await?;
    let total_marks = questions.iter().map(|question| question.marks).sum::<f64>();
    let passing_marks = resolve_passing_marks(&state, payload.passing_marks, total_marks)?;
    let organization_id = payload.organization_id.as_deref().or(author.organization_id.as_deref());

    let test = repositories::tests::create(
        state.db(),
        CreateTest {
            id: &Uuid::new_v4().to_string(),
            title: payload.title.trim(),
            description: payload.description.trim(),
            company_name: payload.company_name.trim(),
            organization_id,
            created_by: Some(&author.id),
            duration_minutes: payload.duration_minutes,
            total_marks,
            passing_marks,
            questions,
            settings: payload.settings,
            is_active: payload.is_active,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create test"))?;

    tracing::info!(
        author_id = %author.id,
        test_id = %test.id,
        questions = test.questions.0.len(),
        total_marks = test.total_marks,
        action = "test_create",
        "Test created"
    );

    Ok((StatusCode::CREATED, Json(TestResponse::from_db(test, true))))
}

async fn update_test(
    Path(test_id): Path<String>,
    CurrentRecruiter(author): CurrentRecruiter,
    State(state): State<AppState>,
    Json(payload): Json<TestUpdate>,
) -> Result<Json<TestResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = fetch_test(&state, &test_id).await?;
    ensure_author(&author, existing.created_by.as_deref())?;

    let questions = if payload.questions.is_some() || payload.question_ids.is_some() {
        let inline = payload.questions.unwrap_or_default();
        let ids = payload.question_ids.unwrap_or_default();
        Some(assemble_questions(&state, inline, &ids).await?)
    } else {
        None
    };

    let total_marks = questions
        .as_ref()
        .map(|questions| questions.iter().map(|question| question.marks).sum::<f64>());
    let passing_marks = match (total_marks, payload.passing_marks) {
        (Some(total), requested) => Some(resolve_passing_marks(&state, requested, total)?),
        (None, Some(requested)) => {
            Some(resolve_passing_marks(&state, Some(requested), existing.total_marks)?)
        }
        (None, None) => None,
    };

    let test = repositories::tests::update(
        state.db(),
        &test_id,
        UpdateTest {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description,
            company_name: payload.company_name,
            duration_minutes: payload.duration_minutes,
            total_marks,
            passing_marks,
            questions,
            settings: payload.settings,
            is_active: payload.is_active,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update test"))?
    .ok_or_else(|| ApiError::NotFound("Test not found".to_string()))?;

    tracing::info!(
        author_id = %author.id,
        test_id = %test.id,
        action = "test_update",
        "Test updated"
    );

    Ok(Json(TestResponse::from_db(test, true)))
}

async fn toggle_active(
    Path(test_id): Path<String>,
    CurrentRecruiter(author): CurrentRecruiter,
    State(state): State<AppState>,
) -> Result<Json<TestResponse>, ApiError> {
    let existing = fetch_test(&state, &test_id).await?;
    ensure_author(&author, existing.created_by.as_deref())?;

    let test = repositories::tests::update(
        state.db(),
        &test_id,
        UpdateTest { is_active: Some(!existing.is_active), ..UpdateTest::default() },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to toggle test"))?
    .ok_or_else(|| ApiError::NotFound("Test not found".to_string()))?;

    tracing::info!(
        author_id = %author.id,
        test_id = %test.id,
        is_active = test.is_active,
        action = "test_toggle_active",
        "Test activation toggled"
    );

    Ok(Json(TestResponse::from_db(test, true)))
}

async fn delete_test(
    Path(test_id): Path<String>,
    CurrentRecruiter(author): CurrentRecruiter,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let existing = fetch_test(&state, &test_id).await?;
    ensure_author(&author, existing.created_by.as_deref())?;

    repositories::tests::delete_by_id(state.db(), &test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete test"))?;

    tracing::info!(
        author_id = %author.id,
        test_id = %test_id,
        action = "test_delete",
        "Test deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests;
