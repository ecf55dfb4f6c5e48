use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{AnswerMap, ExamResult, TestQuestion, ViolationRecord};
use crate::db::types::ResultStatus;

pub(crate) const COLUMNS: &str = "\
    id, exam_session_id, student_id, test_id, score, total_marks, percentage, time_taken, \
    status, violations, cheating_probability, questions, answers, created_at";

const JOINED_SELECT: &str = "\
    SELECT r.id, r.exam_session_id, r.student_id, r.test_id, r.score, r.total_marks, \
           r.percentage, r.time_taken, r.status, r.violations, r.cheating_probability, \
           r.questions, r.answers, r.created_at, \
           t.title AS test_title, p.full_name AS student_name, \
           s.enrollment_number AS enrollment_number \
    FROM results r \
    LEFT JOIN tests t ON t.id = r.test_id \
    LEFT JOIN profiles p ON p.id = r.student_id \
    LEFT JOIN students s ON s.profile_id = r.student_id \
    WHERE TRUE";

/// Result joined with the names the listing and reports display.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ResultRow {
    #[sqlx(flatten)]
    pub(crate) result: ExamResult,
    pub(crate) test_title: Option<String>,
    pub(crate) student_name: Option<String>,
    pub(crate) enrollment_number: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum ResultSort {
    #[default]
    Date,
    Score,
    Percentage,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ResultFilter {
    pub(crate) search: Option<String>,
    pub(crate) status: Option<ResultStatus>,
    pub(crate) student_id: Option<String>,
    pub(crate) test_id: Option<String>,
    /// Restricts to tests authored by this profile.
    pub(crate) test_author: Option<String>,
}

pub(crate) struct CreateResult<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_session_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) test_id: &'a str,
    pub(crate) score: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) time_taken: i32,
    pub(crate) status: ResultStatus,
    pub(crate) violations: Vec<ViolationRecord>,
    pub(crate) cheating_probability: f64,
    pub(crate) questions: Vec<TestQuestion>,
    pub(crate) answers: AnswerMap,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Aggregates over the result set the caller can see.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub(crate) struct ResultStats {
    pub(crate) total: i64,
    pub(crate) average_percentage: f64,
    pub(crate) average_score: f64,
    pub(crate) passed: i64,
    pub(crate) violations: i64,
    pub(crate) time_taken_minutes: i64,
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ResultFilter) {
    super::push_search(
        builder,
        &[
            "COALESCE(t.title, '')",
            "COALESCE(p.full_name, '')",
            "COALESCE(s.enrollment_number, '')",
        ],
        filter.search.as_deref(),
    );
    if let Some(status) = filter.status {
        builder.push(" AND r.status = ");
        builder.push_bind(status);
    }
    if let Some(student_id) = &filter.student_id {
        builder.push(" AND r.student_id = ");
        builder.push_bind(student_id.clone());
    }
    if let Some(test_id) = &filter.test_id {
        builder.push(" AND r.test_id = ");
        builder.push_bind(test_id.clone());
    }
    if let Some(author) = &filter.test_author {
        builder.push(" AND t.created_by = ");
        builder.push_bind(author.clone());
    }
}

fn push_order(builder: &mut QueryBuilder<'_, Postgres>, sort: ResultSort) {
    builder.push(match sort {
        ResultSort::Date => " ORDER BY r.created_at DESC, r.id",
        ResultSort::Score => " ORDER BY r.score DESC, r.created_at DESC",
        ResultSort::Percentage => " ORDER BY r.percentage DESC, r.created_at DESC",
    });
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &ResultFilter,
    sort: ResultSort,
    skip: i64,
    limit: i64,
) -> Result<Vec<ResultRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(JOINED_SELECT);
    push_filter(&mut builder, filter);
    push_order(&mut builder, sort);

    builder.push(" OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<ResultRow>().fetch_all(pool).await
}

/// Unpaginated variant for the all-results report.
pub(crate) async fn list_all(
    pool: &PgPool,
    filter: &ResultFilter,
    sort: ResultSort,
) -> Result<Vec<ResultRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(JOINED_SELECT);
    push_filter(&mut builder, filter);
    push_order(&mut builder, sort);

    builder.build_query_as::<ResultRow>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &ResultFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FROM results r \
         LEFT JOIN tests t ON t.id = r.test_id \
         LEFT JOIN profiles p ON p.id = r.student_id \
         LEFT JOIN students s ON s.profile_id = r.student_id \
         WHERE TRUE",
    );
    push_filter(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn find_row_by_id(pool: &PgPool, id: &str) -> Result<Option<ResultRow>, sqlx::Error> {
    sqlx::query_as::<_, ResultRow>(&format!("{JOINED_SELECT} AND r.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_session(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<Option<ExamResult>, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!(
        "SELECT {COLUMNS} FROM results WHERE exam_session_id = $1"
    ))
    .bind(session_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateResult<'_>,
) -> Result<ExamResult, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!(
        "INSERT INTO results (
            id, exam_session_id, student_id, test_id, score, total_marks, percentage, time_taken,
            status, violations, cheating_probability, questions, answers, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_session_id)
    .bind(params.student_id)
    .bind(params.test_id)
    .bind(params.score)
    .bind(params.total_marks)
    .bind(params.percentage)
    .bind(params.time_taken)
    .bind(params.status)
    .bind(Json(params.violations))
    .bind(params.cheating_probability)
    .bind(Json(params.questions))
    .bind(Json(params.answers))
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update_status(
    pool: &PgPool,
    id: &str,
    status: ResultStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE results SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn latest(pool: &PgPool) -> Result<Option<ResultRow>, sqlx::Error> {
    sqlx::query_as::<_, ResultRow>(&format!("{JOINED_SELECT} ORDER BY r.created_at DESC LIMIT 1"))
        .fetch_optional(pool)
        .await
}

/// `pass_percentage` decides what counts as passed here, independent of the
/// stored status.
pub(crate) async fn stats(
    pool: &PgPool,
    filter: &ResultFilter,
    pass_percentage: f64,
) -> Result<ResultStats, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) AS total,
                COALESCE(AVG(r.percentage), 0)::DOUBLE PRECISION AS average_percentage,
                COALESCE(AVG(r.score), 0)::DOUBLE PRECISION AS average_score,
                COUNT(*) FILTER (WHERE r.percentage >= ",
    );
    builder.push_bind(pass_percentage);
    builder.push(
        ") AS passed,
                COALESCE(SUM(jsonb_array_length(r.violations)), 0)::BIGINT AS violations,
                COALESCE(SUM(r.time_taken), 0)::BIGINT AS time_taken_minutes
         FROM results r
         LEFT JOIN tests t ON t.id = r.test_id
         LEFT JOIN profiles p ON p.id = r.student_id
         LEFT JOIN students s ON s.profile_id = r.student_id
         WHERE TRUE",
    );
    push_filter(&mut builder, filter);

    builder.build_query_as::<ResultStats>().fetch_one(pool).await
}
