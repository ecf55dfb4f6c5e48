use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentRecruiter;
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::{optional_filter, validate_question_shape};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Profile, Question};
use crate::repositories;
use crate::repositories::questions::{CreateQuestion, QuestionFilter, UpdateQuestion};
use crate::schemas::question::{
    QuestionCreate, QuestionListQuery, QuestionResponse, QuestionUpdate,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_questions).post(create_question))
        .route("/:question_id", get(get_question).patch(update_question).delete(delete_question))
}

/// Recruiters manage their own questions; administrators manage all of them.
pub(crate) fn ensure_author(profile: &Profile, created_by: Option<&str>) -> Result<(), ApiError> {
    if profile.role.is_admin() || created_by == Some(profile.id.as_str()) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("You can only modify content you created"))
    }
}

async fn fetch_question(state: &AppState, question_id: &str) -> Result<Question, ApiError> {
    repositories::questions::find_by_id(state.db(), question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))
}

async fn list_questions(
    Query(params): Query<QuestionListQuery>,
    CurrentRecruiter(_author): CurrentRecruiter,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<QuestionResponse>>, ApiError> {
    let filter = QuestionFilter {
        question_type: params.question_type,
        difficulty: params.difficulty,
        search: optional_filter(params.search),
        active_only: params.active,
    };

    let questions = repositories::questions::list(state.db(), &filter, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;
    let total_count = repositories::questions::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    Ok(Json(PaginatedResponse {
        items: questions.into_iter().map(QuestionResponse::from_db).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

async fn get_question(
    Path(question_id): Path<String>,
    CurrentRecruiter(_author): CurrentRecruiter,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question = fetch_question(&state, &question_id).await?;
    Ok(Json(QuestionResponse::from_db(question)))
}

async fn create_question(
    CurrentRecruiter(author): CurrentRecruiter,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_question_shape(
        payload.question_type,
        &payload.options,
        payload.correct_answer.as_ref(),
        payload.marks,
    )?;

    let organization_id = payload.organization_id.as_deref().or(author.organization_id.as_deref());
    let question = repositories::questions::create(
        state.db(),
        CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            question_text: payload.question_text.trim(),
            question_type: payload.question_type,
            options: payload.options,
            correct_answer: payload.correct_answer,
            marks: payload.marks,
            negative_marks: payload.negative_marks,
            difficulty_level: payload.difficulty_level,
            topic: payload.topic.trim(),
            subject: payload.subject.as_deref(),
            tags: payload.tags,
            created_by: Some(&author.id),
            organization_id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    tracing::info!(
        author_id = %author.id,
        question_id = %question.id,
        question_type = question.question_type.as_str(),
        action = "question_create",
        "Question created"
    );

    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question))))
}

async fn update_question(
    Path(question_id): Path<String>,
    CurrentRecruiter(author): CurrentRecruiter,
    State(state): State<AppState>,
    Json(payload): Json<QuestionUpdate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = fetch_question(&state, &question_id).await?;
    ensure_author(&author, existing.created_by.as_deref())?;

    let correct_answer =
        payload.correct_answer.clone().or_else(|| existing.correct_answer.map(|value| value.0));
    validate_question_shape(
        existing.question_type,
        payload.options.as_deref().unwrap_or(existing.options.0.as_slice()),
        correct_answer.as_ref(),
        payload.marks.unwrap_or(existing.marks),
    )?;

    let question = repositories::questions::update(
        state.db(),
        &question_id,
        UpdateQuestion {
            question_text: payload.question_text.map(|text| text.trim().to_string()),
            options: payload.options,
            correct_answer: payload.correct_answer,
            marks: payload.marks,
            negative_marks: payload.negative_marks,
            difficulty_level: payload.difficulty_level,
            topic: payload.topic,
            subject: payload.subject,
            tags: payload.tags,
            is_active: payload.is_active,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update question"))?
    .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    tracing::info!(
        author_id = %author.id,
        question_id = %question.id,
        action = "question_update",
        "Question updated"
    );

    Ok(Json(QuestionResponse::from_db(question)))
}

async fn delete_question(
    Path(question_id): Path<String>,
    CurrentRecruiter(author): CurrentRecruiter,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let existing = fetch_question(&state, &question_id).await?;
    ensure_author(&author, existing.created_by.as_deref())?;

    repositories::questions::delete_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;

    tracing::info!(
        author_id = %author.id,
        question_id = %question_id,
        action = "question_delete",
        "Question deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::test_support;

    #[tokio::test]
    async fn recruiter_creates_and_filters_questions() {
        let ctx = test_support::setup_test_context().await;
        let recruiter = test_support::insert_profile(
            ctx.state.db(),
            "recruiter@techcorp.com",
            "Recruiter",
            "recruiter-pass",
            UserRole::Recruiter,
        )
        .await;
        let token = test_support::bearer_token(&recruiter.id, ctx.state.settings());

        let payloads = [
            json!({
                "question": "What does HTTP stand for?",
                "type": "mcq",
                "options": ["HyperText Transfer Protocol", "High Transfer Text", "Host Text", "None"],
                "correctAnswer": 0,
                "marks": 2,
                "difficulty": "easy",
                "topic": "Networking"
            }),
            json!({
                "question_text": "Explain ownership in Rust.",
                "question_type": "subjective",
                "marks": 5,
                "difficulty_level": "hard",
                "topic": "Rust"
            }),
        ];
        for payload in payloads {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::POST,
                    "/api/v1/questions",
                    Some(&token),
                    Some(payload),
                ))
                .await
                .expect("create question");
            let status = response.status();
            let body = test_support::read_json(response).await;
            assert_eq!(status, StatusCode::CREATED, "response: {body}");
        }

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/questions?type=mcq",
                Some(&token),
                None,
            ))
            .await
            .expect("list questions");
        let listed = test_support::read_json(response).await;
        assert_eq!(listed["total_count"], 1);
        assert_eq!(listed["items"][0]["correct_answer"], 0);
        assert_eq!(listed["items"][0]["difficulty_level"], "easy");
    }

    #[tokio::test]
    async fn mcq_key_outside_options_is_rejected() {
        let ctx = test_support::setup_test_context().await;
        let recruiter = test_support::insert_profile(
            ctx.state.db(),
            "recruiter@techcorp.com",
            "Recruiter",
            "recruiter-pass",
            UserRole::Recruiter,
        )
        .await;
        let token = test_support::bearer_token(&recruiter.id, ctx.state.settings());

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/questions",
                Some(&token),
                Some(json!({
                    "question": "2 + 2 = ?",
                    "type": "mcq",
                    "options": ["3", "4"],
                    "correctAnswer": 5
                })),
            ))
            .await
            .expect("create question");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recruiter_cannot_edit_foreign_question() {
        let ctx = test_support::setup_test_context().await;
        let owner = test_support::insert_profile(
            ctx.state.db(),
            "owner@techcorp.com",
            "Owner",
            "recruiter-pass",
            UserRole::Recruiter,
        )
        .await;
        let other = test_support::insert_profile(
            ctx.state.db(),
            "other@techcorp.com",
            "Other",
            "recruiter-pass",
            UserRole::Recruiter,
        )
        .await;
        let owner_token = test_support::bearer_token(&owner.id, ctx.state.settings());
        let other_token = test_support::bearer_token(&other.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/questions",
                Some(&owner_token),
                Some(json!({ "question": "Describe a deadlock.", "type": "subjective" })),
            ))
            .await
            .expect("create question");
        let created = test_support::read_json(response).await;
        let question_id = created["id"].as_str().expect("id").to_string();

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::PATCH,
                &format!("/api/v1/questions/{question_id}"),
                Some(&other_token),
                Some(json!({ "topic": "Operating Systems" })),
            ))
            .await
            .expect("update question");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
