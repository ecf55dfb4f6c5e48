use anyhow::{anyhow, Context, Result};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::db::models::{ExamResult, ExamSession};
use crate::db::types::SessionStatus;
use crate::repositories;
use crate::repositories::responses::NewResponse;
use crate::repositories::results::CreateResult;
use crate::services::scoring::{self, Thresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinalizeMode {
    ManualSubmit,
    AutoDeadline,
}

impl FinalizeMode {
    fn status(self) -> SessionStatus {
        match self {
            FinalizeMode::ManualSubmit => SessionStatus::Completed,
            FinalizeMode::AutoDeadline => SessionStatus::Expired,
        }
    }
}

#[derive(Debug)]
pub(crate) enum FinalizeOutcome {
    Finalized(ExamResult),
    /// Another request finished the session first; carries its result when
    /// one was produced.
    AlreadyFinished(Option<ExamResult>),
}

/// Scores the answers saved on `session`, writes the per-question responses
/// and the result row, and closes the session. Everything happens in one
/// transaction so a concurrent submit and deadline sweep produce one result.
pub(crate) async fn finalize_session(
    state: &AppState,
    session: &ExamSession,
    mode: FinalizeMode,
    now: PrimitiveDateTime,
) -> Result<FinalizeOutcome> {
    let submitted_at = match mode {
        FinalizeMode::ManualSubmit => now,
        FinalizeMode::AutoDeadline => now.min(session.expires_at),
    };

    let mut tx = state.db().begin().await.context("Failed to begin finalize transaction")?;

    let test = repositories::tests::find_by_id(&mut *tx, &session.test_id)
        .await
        .context("Failed to fetch test")?
        .ok_or_else(|| anyhow!("Test {} missing for session {}", session.test_id, session.id))?;

    if !repositories::sessions::finish(&mut *tx, &session.id, mode.status(), submitted_at, None)
        .await
        .context("Failed to close session")?
    {
        tx.rollback().await.context("Failed to roll back finalize")?;
        let existing = repositories::results::find_by_session(state.db(), &session.id)
            .await
            .context("Failed to fetch existing result")?;
        return Ok(FinalizeOutcome::AlreadyFinished(existing));
    }

    // The row is locked by the status update, so these answers are final.
    let session = repositories::sessions::find_by_id(&mut *tx, &session.id)
        .await
        .context("Failed to reload session")?
        .ok_or_else(|| anyhow!("Session {} vanished during finalize", session.id))?;

    let settings = &test.settings.0;
    let sheet = scoring::score_answers(&test.questions.0, &session.answers.0, settings.negative_marking);

    let violations = repositories::proctoring_events::list_by_session(&mut *tx, &session.id)
        .await
        .context("Failed to fetch proctoring events")?
        .iter()
        .map(|event| event.to_record())
        .collect::<Vec<_>>();
    let violation_count = u32::try_from(session.violation_count.max(0)).unwrap_or(u32::MAX);
    let thresholds = Thresholds::for_test(state.settings(), settings);
    let status = scoring::classify(sheet.percentage, violation_count, thresholds);

    let responses = sheet
        .graded
        .iter()
        .map(|answer| NewResponse {
            question_id: answer.question_id.clone(),
            response_data: answer.response.clone(),
            is_correct: answer.is_correct,
            marks_awarded: answer.marks_awarded,
        })
        .collect::<Vec<_>>();
    repositories::responses::upsert_many(&mut *tx, &session.id, responses, now)
        .await
        .context("Failed to store responses")?;

    let result_id = Uuid::new_v4().to_string();
    let result = repositories::results::create(
        &mut *tx,
        CreateResult {
            id: &result_id,
            exam_session_id: &session.id,
            student_id: &session.student_id,
            test_id: &session.test_id,
            score: sheet.score,
            total_marks: sheet.total_marks,
            percentage: sheet.percentage,
            time_taken: scoring::time_taken_minutes(session.start_time, submitted_at),
            status,
            violations,
            cheating_probability: scoring::cheating_probability(
                violation_count,
                thresholds.max_violations,
            ),
            questions: test.questions.0.clone(),
            answers: session.answers.0.clone(),
            created_at: now,
        },
    )
    .await
    .context("Failed to create result")?;

    tx.commit().await.context("Failed to commit finalize")?;

    match mode {
        FinalizeMode::ManualSubmit => {
            metrics::counter!("exam_sessions_submitted_total").increment(1);
        }
        FinalizeMode::AutoDeadline => {
            metrics::counter!("expired_sessions_submitted_total").increment(1);
        }
    }
    tracing::info!(
        session_id = %session.id,
        result_id = %result.id,
        score = result.score,
        status = result.status.as_str(),
        ?mode,
        "Exam session finalized"
    );

    Ok(FinalizeOutcome::Finalized(result))
}
