use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::ProctoringEvent;
use crate::db::types::ViolationSeverity;

pub(crate) const COLUMNS: &str =
    "id, session_id, event_type, severity, confidence_score, description, occurred_at";

pub(crate) struct CreateEvent<'a> {
    pub(crate) id: &'a str,
    pub(crate) session_id: &'a str,
    pub(crate) event_type: &'a str,
    pub(crate) severity: ViolationSeverity,
    pub(crate) confidence_score: f64,
    pub(crate) description: &'a str,
    pub(crate) occurred_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateEvent<'_>,
) -> Result<ProctoringEvent, sqlx::Error> {
    sqlx::query_as::<_, ProctoringEvent>(&format!(
        "INSERT INTO proctoring_events (
            id, session_id, event_type, severity, confidence_score, description, occurred_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.session_id)
    .bind(params.event_type)
    .bind(params.severity)
    .bind(params.confidence_score)
    .bind(params.description)
    .bind(params.occurred_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_session(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<Vec<ProctoringEvent>, sqlx::Error> {
    sqlx::query_as::<_, ProctoringEvent>(&format!(
        "SELECT {COLUMNS} FROM proctoring_events WHERE session_id = $1 ORDER BY occurred_at ASC"
    ))
    .bind(session_id)
    .fetch_all(executor)
    .await
}

/// Most recent event across all sessions.
pub(crate) async fn latest(pool: &PgPool) -> Result<Option<ProctoringEvent>, sqlx::Error> {
    sqlx::query_as::<_, ProctoringEvent>(&format!(
        "SELECT {COLUMNS} FROM proctoring_events ORDER BY occurred_at DESC LIMIT 1"
    ))
    .fetch_optional(pool)
    .await
}
