use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{AnswerMap, ExamSession};
use crate::db::types::SessionStatus;

pub(crate) const COLUMNS: &str = "\
    id, test_id, student_id, status, start_time, end_time, expires_at, browser_info, \
    device_info, ip_address, answers, last_auto_save, violation_count, is_flagged, \
    termination_reason, created_at, updated_at";

pub(crate) struct CreateSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) test_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) browser_info: serde_json::Value,
    pub(crate) device_info: serde_json::Value,
    pub(crate) ip_address: Option<&'a str>,
}

/// Serializes concurrent starts of the same test by the same student for the
/// rest of the transaction.
pub(crate) async fn lock_start(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("exam-start:{test_id}:{student_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!("SELECT {COLUMNS} FROM exam_sessions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {COLUMNS} FROM exam_sessions \
         WHERE test_id = $1 AND student_id = $2 AND status = $3"
    ))
    .bind(test_id)
    .bind(student_id)
    .bind(SessionStatus::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_sessions WHERE status = $1")
        .bind(SessionStatus::InProgress)
        .fetch_one(executor)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateSession<'_>,
) -> Result<ExamSession, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "INSERT INTO exam_sessions (
            id, test_id, student_id, status, start_time, expires_at,
            browser_info, device_info, ip_address, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$5,$5)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.test_id)
    .bind(params.student_id)
    .bind(SessionStatus::InProgress)
    .bind(params.start_time)
    .bind(params.expires_at)
    .bind(Json(params.browser_info))
    .bind(Json(params.device_info))
    .bind(params.ip_address)
    .fetch_one(executor)
    .await
}

/// Merges `answers` into the stored map. No-op unless the session is still in
/// progress.
pub(crate) async fn save_answers(
    pool: &PgPool,
    id: &str,
    answers: &AnswerMap,
    now: PrimitiveDateTime,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "UPDATE exam_sessions
         SET answers = answers || $1, last_auto_save = $2, updated_at = $2
         WHERE id = $3 AND status = $4
         RETURNING {COLUMNS}"
    ))
    .bind(Json(answers))
    .bind(now)
    .bind(id)
    .bind(SessionStatus::InProgress)
    .fetch_optional(pool)
    .await
}

/// Bumps the violation counter and flags the session once `flag_at` is
/// reached. Returns the new count, or `None` when the session is not in
/// progress.
pub(crate) async fn record_violation(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    flag_at: i32,
    now: PrimitiveDateTime,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE exam_sessions
         SET violation_count = violation_count + 1,
             is_flagged = is_flagged OR violation_count + 1 >= $1,
             updated_at = $2
         WHERE id = $3 AND status = $4
         RETURNING violation_count",
    )
    .bind(flag_at)
    .bind(now)
    .bind(id)
    .bind(SessionStatus::InProgress)
    .fetch_optional(executor)
    .await
}

/// Moves an in-progress session to a terminal status. Returns `false` when
/// another request already finished it.
pub(crate) async fn finish(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: SessionStatus,
    end_time: PrimitiveDateTime,
    termination_reason: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_sessions
         SET status = $1, end_time = $2, termination_reason = $3, updated_at = $2
         WHERE id = $4 AND status = $5",
    )
    .bind(status)
    .bind(end_time)
    .bind(termination_reason)
    .bind(id)
    .bind(SessionStatus::InProgress)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_in_progress(pool: &PgPool) -> Result<Vec<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {COLUMNS} FROM exam_sessions WHERE status = $1 ORDER BY start_time ASC"
    ))
    .bind(SessionStatus::InProgress)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_expired(
    pool: &PgPool,
    now: PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {COLUMNS} FROM exam_sessions
         WHERE status = $1 AND expires_at <= $2
         ORDER BY expires_at ASC
         LIMIT $3"
    ))
    .bind(SessionStatus::InProgress)
    .bind(now)
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    student_id: Option<&str>,
    test_id: Option<&str>,
    status: Option<SessionStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamSession>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM exam_sessions WHERE TRUE"));

    if let Some(student_id) = student_id {
        builder.push(" AND student_id = ");
        builder.push_bind(student_id.to_string());
    }
    if let Some(test_id) = test_id {
        builder.push(" AND test_id = ");
        builder.push_bind(test_id.to_string());
    }
    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY start_time DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<ExamSession>().fetch_all(pool).await
}

/// Sum of session violation counters, optionally for one student.
pub(crate) async fn total_violations(
    pool: &PgPool,
    student_id: Option<&str>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(violation_count), 0)::BIGINT FROM exam_sessions
         WHERE $1::TEXT IS NULL OR student_id = $1",
    )
    .bind(student_id)
    .fetch_one(pool)
    .await
}
