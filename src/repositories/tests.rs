use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{Test, TestQuestion, TestSettings};

pub(crate) const COLUMNS: &str = "\
    id, title, description, company_name, organization_id, created_by, duration_minutes, \
    total_marks, passing_marks, questions, settings, is_active, created_at, updated_at";

#[derive(Debug, Default, Clone)]
pub(crate) struct TestFilter {
    pub(crate) active_only: bool,
    pub(crate) created_by: Option<String>,
    pub(crate) search: Option<String>,
}

pub(crate) struct CreateTest<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) company_name: &'a str,
    pub(crate) organization_id: Option<&'a str>,
    pub(crate) created_by: Option<&'a str>,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: f64,
    pub(crate) passing_marks: f64,
    pub(crate) questions: Vec<TestQuestion>,
    pub(crate) settings: TestSettings,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Default)]
pub(crate) struct UpdateTest {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) company_name: Option<String>,
    pub(crate) duration_minutes: Option<i32>,
    pub(crate) total_marks: Option<f64>,
    pub(crate) passing_marks: Option<f64>,
    pub(crate) questions: Option<Vec<TestQuestion>>,
    pub(crate) settings: Option<TestSettings>,
    pub(crate) is_active: Option<bool>,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!("SELECT {COLUMNS} FROM tests WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &TestFilter) {
    if filter.active_only {
        builder.push(" AND is_active");
    }
    if let Some(created_by) = &filter.created_by {
        builder.push(" AND created_by = ");
        builder.push_bind(created_by.clone());
    }
    super::push_search(builder, &["title", "company_name"], filter.search.as_deref());
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &TestFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<Test>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM tests WHERE TRUE"));
    push_filter(&mut builder, filter);

    builder.push(" ORDER BY created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Test>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &TestFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tests WHERE TRUE");
    push_filter(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn create(pool: &PgPool, params: CreateTest<'_>) -> Result<Test, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!(
        "INSERT INTO tests (
            id, title, description, company_name, organization_id, created_by, duration_minutes,
            total_marks, passing_marks, questions, settings, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$13)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.company_name)
    .bind(params.organization_id)
    .bind(params.created_by)
    .bind(params.duration_minutes)
    .bind(params.total_marks)
    .bind(params.passing_marks)
    .bind(Json(params.questions))
    .bind(Json(params.settings))
    .bind(params.is_active)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateTest,
    now: PrimitiveDateTime,
) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!(
        "UPDATE tests SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            company_name = COALESCE($3, company_name),
            duration_minutes = COALESCE($4, duration_minutes),
            total_marks = COALESCE($5, total_marks),
            passing_marks = COALESCE($6, passing_marks),
            questions = COALESCE($7, questions),
            settings = COALESCE($8, settings),
            is_active = COALESCE($9, is_active),
            updated_at = $10
         WHERE id = $11
         RETURNING {COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.company_name)
    .bind(params.duration_minutes)
    .bind(params.total_marks)
    .bind(params.passing_marks)
    .bind(params.questions.map(Json))
    .bind(params.settings.map(Json))
    .bind(params.is_active)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tests WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn count_active(
    pool: &PgPool,
    created_by: Option<&str>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM tests WHERE is_active AND ($1::TEXT IS NULL OR created_by = $1)",
    )
    .bind(created_by)
    .fetch_one(pool)
    .await
}

pub(crate) async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM tests").fetch_one(pool).await
}

pub(crate) async fn latest(pool: &PgPool) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!("SELECT {COLUMNS} FROM tests ORDER BY created_at DESC LIMIT 1"))
        .fetch_optional(pool)
        .await
}
