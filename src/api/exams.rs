use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentStudent, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{AnswerMap, ExamSession, Profile, Test};
use crate::db::types::{SessionStatus, UserRole};
use crate::repositories;
use crate::repositories::sessions::CreateSession;
use crate::schemas::exam::{
    ExamTestView, SaveAnswersRequest, SaveAnswersResponse, SessionListQuery, SessionResponse,
    StartExamRequest, SubmitRequest, SubmitResponse, TerminateRequest, ViolationReport,
    ViolationResponse,
};
use crate::schemas::result::ResultResponse;
use crate::services::exam_finalize::{self, FinalizeMode, FinalizeOutcome};
use crate::services::proctoring::{self, ViolationKind, CAMERA_ERROR, TAB_SWITCH};
use crate::services::scoring::Thresholds;
use crate::services::{exam_timer, violations};

/// Client-reported violations carry full confidence.
const REPORTED_CONFIDENCE: f64 = 1.0;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_exam))
        .route("/sessions", get(list_sessions))
        .route("/sessions/:session_id", get(get_session))
        .route("/sessions/:session_id/answers", put(save_answers))
        .route("/sessions/:session_id/tab-switch", post(report_tab_switch))
        .route("/sessions/:session_id/camera-error", post(report_camera_error))
        .route("/sessions/:session_id/violations", get(list_violations))
        .route("/sessions/:session_id/submit", post(submit_exam))
        .route("/sessions/:session_id/terminate", post(terminate_session))
}

async fn fetch_test(state: &AppState, test_id: &str) -> Result<Test, ApiError> {
    repositories::tests::find_by_id(state.db(), test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch test"))?
        .ok_or_else(|| ApiError::NotFound("Test not found".to_string()))
}

async fn fetch_session(state: &AppState, session_id: &str) -> Result<ExamSession, ApiError> {
    repositories::sessions::find_by_id(state.db(), session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam session"))?
        .ok_or_else(|| ApiError::NotFound("Exam session not found".to_string()))
}

/// Students reach their own sessions, recruiters the sessions of tests they
/// authored, administrators every session.
async fn load_session(
    state: &AppState,
    session_id: &str,
    profile: &Profile,
) -> Result<(ExamSession, Test), ApiError> {
    let session = fetch_session(state, session_id).await?;
    let test = fetch_test(state, &session.test_id).await?;

    let allowed = if profile.role == UserRole::Student {
        session.student_id == profile.id
    } else {
        profile.role.is_admin() || test.created_by.as_deref() == Some(profile.id.as_str())
    };
    if !allowed {
        return Err(ApiError::Forbidden("Access denied"));
    }

    Ok((session, test))
}

/// Auto-submits `session` when its deadline passed. Returns the session as
/// stored afterwards and the id of the result the deadline produced.
async fn settle_deadline(
    state: &AppState,
    session: ExamSession,
    now: PrimitiveDateTime,
) -> Result<(ExamSession, Option<String>), ApiError> {
    if session.status != SessionStatus::InProgress
        || !exam_timer::is_expired(now, session.expires_at)
    {
        return Ok((session, None));
    }

    let outcome =
        exam_finalize::finalize_session(state, &session, FinalizeMode::AutoDeadline, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to auto-submit expired session"))?;
    let result_id = match outcome {
        FinalizeOutcome::Finalized(result) => Some(result.id),
        FinalizeOutcome::AlreadyFinished(result) => result.map(|result| result.id),
    };

    let session = fetch_session(state, &session.id).await?;
    Ok((session, result_id))
}

async fn result_id_for(state: &AppState, session: &ExamSession) -> Result<Option<String>, ApiError> {
    if session.status == SessionStatus::InProgress {
        return Ok(None);
    }
    let result = repositories::results::find_by_session(state.db(), &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch result"))?;
    Ok(result.map(|result| result.id))
}

fn ensure_known_questions(test: &Test, answers: &AnswerMap) -> Result<(), ApiError> {
    match answers
        .keys()
        .find(|key| !test.questions.0.iter().any(|question| &question.id == *key))
    {
        Some(unknown) => Err(ApiError::BadRequest(format!("Unknown question id: {unknown}"))),
        None => Ok(()),
    }
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next());
    let real_ip = headers.get("x-real-ip").and_then(|value| value.to_str().ok());

    forwarded
        .or(real_ip)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

async fn start_exam(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<StartExamRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let test = fetch_test(&state, &payload.test_id).await?;
    if !test.is_active {
        return Err(ApiError::NotFound("Test not found".to_string()));
    }
    if test.questions.0.is_empty() {
        return Err(ApiError::BadRequest("Test has no questions".to_string()));
    }

    let now = primitive_now_utc();
    let stale = repositories::sessions::find_in_progress(state.db(), &test.id, &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing session"))?;
    if let Some(stale) = stale {
        settle_deadline(&state, stale, now).await?;
    }

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;

    repositories::sessions::lock_start(&mut *tx, &test.id, &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock exam start"))?;

    let existing = repositories::sessions::find_in_progress(&mut *tx, &test.id, &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing session"))?;
    if let Some(session) = existing {
        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
        let view = ExamTestView::for_session(test, &session.id);
        return Ok((StatusCode::OK, Json(SessionResponse::from_db(session, now).with_test(Some(view)))));
    }

    let active_sessions = repositories::sessions::count_in_progress(&mut *tx)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count active sessions"))?;
    let max_concurrent = state.settings().exam().max_concurrent_exams;
    if u64::try_from(active_sessions).unwrap_or(0) >= max_concurrent {
        return Err(ApiError::ServiceUnavailable(
            "Exam service is temporarily at capacity. Try again in a few minutes.".to_string(),
        ));
    }

    let session_id = Uuid::new_v4().to_string();
    let expires_at = exam_timer::deadline(
        now,
        test.duration_minutes,
        state.settings().exam().default_duration_seconds,
    );
    let ip_address = client_ip(&headers);
    let session = repositories::sessions::create(
        &mut *tx,
        CreateSession {
            id: &session_id,
            test_id: &test.id,
            student_id: &student.id,
            start_time: now,
            expires_at,
            browser_info: payload.browser_info,
            device_info: payload.device_info,
            ip_address: ip_address.as_deref(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam session"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    metrics::counter!("exam_sessions_started_total").increment(1);
    tracing::info!(
        student_id = %student.id,
        test_id = %test.id,
        session_id = %session.id,
        expires_at = %format_primitive(session.expires_at),
        action = "exam_start",
        "Exam session started"
    );

    let view = ExamTestView::for_session(test, &session.id);
    Ok((StatusCode::CREATED, Json(SessionResponse::from_db(session, now).with_test(Some(view)))))
}

async fn list_sessions(
    Query(params): Query<SessionListQuery>,
    CurrentUser(profile): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let student_id = if profile.role == UserRole::Student {
        Some(profile.id.clone())
    } else {
        params.student_id.clone()
    };

    if profile.role == UserRole::Recruiter {
        let test_id = params
            .test_id
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("test_id is required".to_string()))?;
        let test = fetch_test(&state, test_id).await?;
        if test.created_by.as_deref() != Some(profile.id.as_str()) {
            return Err(ApiError::Forbidden("Access denied"));
        }
    }

    let sessions = repositories::sessions::list(
        state.db(),
        student_id.as_deref(),
        params.test_id.as_deref(),
        params.status,
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list exam sessions"))?;

    let now = primitive_now_utc();
    let mut items = Vec::with_capacity(sessions.len());
    for session in sessions {
        let (session, result_id) = settle_deadline(&state, session, now).await?;
        items.push(SessionResponse::from_db(session, now).with_result(result_id));
    }

    Ok(Json(items))
}

async fn get_session(
    Path(session_id): Path<String>,
    CurrentUser(profile): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (session, test) = load_session(&state, &session_id, &profile).await?;
    let now = primitive_now_utc();
    let (session, settled_result) = settle_deadline(&state, session, now).await?;

    let result_id = match settled_result {
        Some(result_id) => Some(result_id),
        None => result_id_for(&state, &session).await?,
    };
    let view = (session.status == SessionStatus::InProgress)
        .then(|| ExamTestView::for_session(test, &session.id));

    Ok(Json(SessionResponse::from_db(session, now).with_test(view).with_result(result_id)))
}

/// Loads a session owned by `student` that is still running. An expired
/// session is auto-submitted and reported as such.
async fn load_running_session(
    state: &AppState,
    session_id: &str,
    student: &Profile,
    now: PrimitiveDateTime,
) -> Result<(ExamSession, Test), ApiError> {
    let (session, test) = load_session(state, session_id, student).await?;
    if session.status != SessionStatus::InProgress {
        return Err(ApiError::BadRequest("Exam session is not in progress".to_string()));
    }
    if exam_timer::is_expired(now, session.expires_at) {
        settle_deadline(state, session, now).await?;
        return Err(ApiError::BadRequest("Exam session has expired".to_string()));
    }
    Ok((session, test))
}

async fn save_answers(
    Path(session_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<SaveAnswersRequest>,
) -> Result<Json<SaveAnswersResponse>, ApiError> {
    let now = primitive_now_utc();
    let (session, test) = load_running_session(&state, &session_id, &student, now).await?;
    ensure_known_questions(&test, &payload.answers)?;

    let interval = state.settings().exam().auto_save_interval_seconds.max(1);
    let rate_key = format!("rl:autosave:{}", session.id);
    let allowed = state.redis().rate_limit(&rate_key, 1, interval).await.unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Auto-save rate limit exceeded"));
    }

    let saved = repositories::sessions::save_answers(state.db(), &session.id, &payload.answers, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to save answers"))?
        .ok_or_else(|| ApiError::BadRequest("Exam session is not in progress".to_string()))?;

    tracing::debug!(session_id = %saved.id, answered = saved.answers.0.len(), "Answers saved");

    Ok(Json(SaveAnswersResponse {
        session_id: saved.id,
        saved_at: format_primitive(now),
        answered: saved.answers.0.len(),
        remaining_seconds: exam_timer::remaining_seconds(now, saved.expires_at),
    }))
}

async fn report_violation(
    state: &AppState,
    student: &Profile,
    session_id: &str,
    kind: ViolationKind,
) -> Result<ViolationReport, ApiError> {
    let now = primitive_now_utc();
    let (session, test) = load_running_session(state, session_id, student, now).await?;
    let settings = &test.settings.0;

    if kind == TAB_SWITCH && !proctoring::records_tab_switch(settings) {
        return Ok(ViolationReport {
            recorded: false,
            violation_count: session.violation_count,
            is_flagged: session.is_flagged,
            event: None,
        });
    }

    let thresholds = Thresholds::for_test(state.settings(), settings);
    let (event, violation_count) = violations::record(
        state.db(),
        &session.id,
        kind,
        REPORTED_CONFIDENCE,
        thresholds.max_violations,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record violation"))?
    .ok_or_else(|| ApiError::BadRequest("Exam session is not in progress".to_string()))?;

    let reached_ceiling =
        u32::try_from(violation_count).map_or(false, |count| count >= thresholds.max_violations);

    Ok(ViolationReport {
        recorded: true,
        violation_count,
        is_flagged: session.is_flagged || reached_ceiling,
        event: Some(ViolationResponse::from_db(event)),
    })
}

async fn report_tab_switch(
    Path(session_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<ViolationReport>, ApiError> {
    Ok(Json(report_violation(&state, &student, &session_id, TAB_SWITCH).await?))
}

async fn report_camera_error(
    Path(session_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<ViolationReport>, ApiError> {
    Ok(Json(report_violation(&state, &student, &session_id, CAMERA_ERROR).await?))
}

async fn list_violations(
    Path(session_id): Path<String>,
    CurrentUser(profile): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ViolationResponse>>, ApiError> {
    let (session, _test) = load_session(&state, &session_id, &profile).await?;
    let events = repositories::proctoring_events::list_by_session(state.db(), &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list violations"))?;

    Ok(Json(events.into_iter().map(ViolationResponse::from_db).collect()))
}

async fn submit_exam(
    Path(session_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    payload: Option<Json<SubmitRequest>>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let (session, test) = load_session(&state, &session_id, &student).await?;

    if session.status != SessionStatus::InProgress {
        let existing = repositories::results::find_by_session(state.db(), &session.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch result"))?;
        return Ok(Json(SubmitResponse {
            session_id: session.id,
            status: session.status,
            result: existing.map(ResultResponse::from_result),
        }));
    }

    let now = primitive_now_utc();
    let mode = if exam_timer::is_expired(now, session.expires_at) {
        FinalizeMode::AutoDeadline
    } else {
        FinalizeMode::ManualSubmit
    };

    if mode == FinalizeMode::ManualSubmit {
        if let Some(answers) = payload.answers.filter(|answers| !answers.is_empty()) {
            ensure_known_questions(&test, &answers)?;
            repositories::sessions::save_answers(state.db(), &session.id, &answers, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to save final answers"))?;
        }
    }

    let outcome = exam_finalize::finalize_session(&state, &session, mode, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to submit exam"))?;
    let result = match outcome {
        FinalizeOutcome::Finalized(result) => Some(result),
        FinalizeOutcome::AlreadyFinished(result) => result,
    };
    let session = fetch_session(&state, &session.id).await?;

    tracing::info!(
        student_id = %student.id,
        session_id = %session.id,
        status = session.status.as_str(),
        action = "exam_submit",
        "Exam submitted"
    );

    Ok(Json(SubmitResponse {
        session_id: session.id,
        status: session.status,
        result: result.map(ResultResponse::from_result),
    }))
}

async fn terminate_session(
    Path(session_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    payload: Option<Json<TerminateRequest>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let session = fetch_session(&state, &session_id).await?;
    let reason = payload
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .unwrap_or("Terminated by administrator");

    let now = primitive_now_utc();
    let finished = repositories::sessions::finish(
        state.db(),
        &session.id,
        SessionStatus::Terminated,
        now,
        Some(reason),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to terminate session"))?;
    if !finished {
        return Err(ApiError::BadRequest("Exam session is not in progress".to_string()));
    }

    tracing::warn!(
        admin_id = %admin.id,
        session_id = %session.id,
        reason,
        action = "exam_terminate",
        "Exam session terminated"
    );

    let session = fetch_session(&state, &session.id).await?;
    Ok(Json(SessionResponse::from_db(session, now)))
}

#[cfg(test)]
mod tests;
