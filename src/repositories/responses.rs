use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::ExamResponse;

pub(crate) const COLUMNS: &str =
    "id, session_id, question_id, response_data, is_correct, marks_awarded, created_at";

pub(crate) struct NewResponse {
    pub(crate) question_id: String,
    pub(crate) response_data: serde_json::Value,
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_awarded: f64,
}

/// Writes one row per answered question. Re-submitting overwrites the earlier
/// grading of the same question.
pub(crate) async fn upsert_many(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
    responses: Vec<NewResponse>,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    if responses.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO exam_responses (
            id, session_id, question_id, response_data, is_correct, marks_awarded, created_at
        ) ",
    );
    builder.push_values(responses, |mut row, response| {
        row.push_bind(Uuid::new_v4().to_string())
            .push_bind(session_id.to_string())
            .push_bind(response.question_id)
            .push_bind(Json(response.response_data))
            .push_bind(response.is_correct)
            .push_bind(response.marks_awarded)
            .push_bind(now);
    });
    builder.push(
        " ON CONFLICT (session_id, question_id) DO UPDATE SET
            response_data = EXCLUDED.response_data,
            is_correct = EXCLUDED.is_correct,
            marks_awarded = EXCLUDED.marks_awarded",
    );

    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}

pub(crate) async fn list_by_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Vec<ExamResponse>, sqlx::Error> {
    sqlx::query_as::<_, ExamResponse>(&format!(
        "SELECT {COLUMNS} FROM exam_responses WHERE session_id = $1 ORDER BY created_at, question_id"
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await
}
