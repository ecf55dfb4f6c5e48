use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Question;
use crate::db::types::{DifficultyLevel, QuestionType};

pub(crate) const COLUMNS: &str = "\
    id, question_text, question_type, options, correct_answer, marks, negative_marks, \
    difficulty_level, topic, subject, tags, created_by, organization_id, is_active, \
    created_at, updated_at";

#[derive(Debug, Default, Clone)]
pub(crate) struct QuestionFilter {
    pub(crate) question_type: Option<QuestionType>,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) search: Option<String>,
    pub(crate) active_only: bool,
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) question_text: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer: Option<serde_json::Value>,
    pub(crate) marks: f64,
    pub(crate) negative_marks: f64,
    pub(crate) difficulty_level: DifficultyLevel,
    pub(crate) topic: &'a str,
    pub(crate) subject: Option<&'a str>,
    pub(crate) tags: Vec<String>,
    pub(crate) created_by: Option<&'a str>,
    pub(crate) organization_id: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Default)]
pub(crate) struct UpdateQuestion {
    pub(crate) question_text: Option<String>,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) correct_answer: Option<serde_json::Value>,
    pub(crate) marks: Option<f64>,
    pub(crate) negative_marks: Option<f64>,
    pub(crate) difficulty_level: Option<DifficultyLevel>,
    pub(crate) topic: Option<String>,
    pub(crate) subject: Option<String>,
    pub(crate) tags: Option<Vec<String>>,
    pub(crate) is_active: Option<bool>,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Rows come back in the order of `ids`; unknown ids are dropped.
pub(crate) async fn find_by_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<Question>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions
         WHERE id = ANY($1)
         ORDER BY array_position($1, id)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &QuestionFilter) {
    if let Some(question_type) = filter.question_type {
        builder.push(" AND question_type = ");
        builder.push_bind(question_type);
    }
    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND difficulty_level = ");
        builder.push_bind(difficulty);
    }
    super::push_search(builder, &["question_text", "topic"], filter.search.as_deref());
    if filter.active_only {
        builder.push(" AND is_active");
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &QuestionFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM questions WHERE TRUE"));
    push_filter(&mut builder, filter);

    builder.push(" ORDER BY created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Question>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &QuestionFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM questions WHERE TRUE");
    push_filter(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, question_text, question_type, options, correct_answer, marks, negative_marks,
            difficulty_level, topic, subject, tags, created_by, organization_id, is_active,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,TRUE,$14,$14)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.question_text)
    .bind(params.question_type)
    .bind(Json(params.options))
    .bind(params.correct_answer.map(Json))
    .bind(params.marks)
    .bind(params.negative_marks)
    .bind(params.difficulty_level)
    .bind(params.topic)
    .bind(params.subject)
    .bind(Json(params.tags))
    .bind(params.created_by)
    .bind(params.organization_id)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateQuestion,
    now: PrimitiveDateTime,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "UPDATE questions SET
            question_text = COALESCE($1, question_text),
            options = COALESCE($2, options),
            correct_answer = COALESCE($3, correct_answer),
            marks = COALESCE($4, marks),
            negative_marks = COALESCE($5, negative_marks),
            difficulty_level = COALESCE($6, difficulty_level),
            topic = COALESCE($7, topic),
            subject = COALESCE($8, subject),
            tags = COALESCE($9, tags),
            is_active = COALESCE($10, is_active),
            updated_at = $11
         WHERE id = $12
         RETURNING {COLUMNS}",
    ))
    .bind(params.question_text)
    .bind(params.options.map(Json))
    .bind(params.correct_answer.map(Json))
    .bind(params.marks)
    .bind(params.negative_marks)
    .bind(params.difficulty_level)
    .bind(params.topic)
    .bind(params.subject)
    .bind(params.tags.map(Json))
    .bind(params.is_active)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
