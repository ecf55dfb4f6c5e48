use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Student;

pub(crate) const COLUMNS: &str = "\
    id, profile_id, enrollment_number, student_name, student_email, student_phone, \
    course, branch, year_of_study, cgpa, skills, placement_status, created_at, updated_at";

/// Listing filter shared by the paginated list, the count and the CSV export.
#[derive(Debug, Default, Clone)]
pub(crate) struct StudentFilter {
    pub(crate) search: Option<String>,
    pub(crate) course: Option<String>,
}

pub(crate) struct CreateStudent<'a> {
    pub(crate) id: &'a str,
    pub(crate) profile_id: Option<&'a str>,
    pub(crate) enrollment_number: &'a str,
    pub(crate) student_name: &'a str,
    pub(crate) student_email: &'a str,
    pub(crate) student_phone: &'a str,
    pub(crate) course: &'a str,
    pub(crate) branch: &'a str,
    pub(crate) year_of_study: Option<i32>,
    pub(crate) cgpa: Option<f64>,
    pub(crate) skills: Vec<String>,
    pub(crate) placement_status: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Default)]
pub(crate) struct UpdateStudent {
    pub(crate) student_name: Option<String>,
    pub(crate) student_email: Option<String>,
    pub(crate) student_phone: Option<String>,
    pub(crate) course: Option<String>,
    pub(crate) branch: Option<String>,
    pub(crate) year_of_study: Option<i32>,
    pub(crate) cgpa: Option<f64>,
    pub(crate) skills: Option<Vec<String>>,
    pub(crate) placement_status: Option<String>,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_profile_id(
    pool: &PgPool,
    profile_id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE profile_id = $1"))
        .bind(profile_id)
        .fetch_optional(pool)
        .await
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &StudentFilter) {
    super::push_search(
        builder,
        &["student_name", "enrollment_number", "student_email"],
        filter.search.as_deref(),
    );

    if let Some(course) = filter.course.as_deref().filter(|value| !value.is_empty() && *value != "all")
    {
        builder.push(" AND course = ");
        builder.push_bind(course.to_string());
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &StudentFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<Student>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM students WHERE TRUE"));
    push_filter(&mut builder, filter);

    builder.push(" ORDER BY created_at DESC, enrollment_number ASC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Student>().fetch_all(pool).await
}

/// Unpaginated variant for exports.
pub(crate) async fn list_all(
    pool: &PgPool,
    filter: &StudentFilter,
) -> Result<Vec<Student>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM students WHERE TRUE"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY created_at DESC, enrollment_number ASC");

    builder.build_query_as::<Student>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &StudentFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students WHERE TRUE");
    push_filter(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn distinct_courses(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT course FROM students WHERE course <> '' ORDER BY course ASC",
    )
    .fetch_all(pool)
    .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateStudent<'_>,
) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (
            id, profile_id, enrollment_number, student_name, student_email, student_phone,
            course, branch, year_of_study, cgpa, skills, placement_status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$13)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.profile_id)
    .bind(params.enrollment_number)
    .bind(params.student_name)
    .bind(params.student_email)
    .bind(params.student_phone)
    .bind(params.course)
    .bind(params.branch)
    .bind(params.year_of_study)
    .bind(params.cgpa)
    .bind(Json(params.skills))
    .bind(params.placement_status)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

/// Inserts unless the enrollment number is already taken. Returns whether a
/// row was written.
pub(crate) async fn insert_if_absent(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateStudent<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO students (
            id, profile_id, enrollment_number, student_name, student_email, student_phone,
            course, branch, year_of_study, cgpa, skills, placement_status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$13)
        ON CONFLICT (enrollment_number) DO NOTHING",
    )
    .bind(params.id)
    .bind(params.profile_id)
    .bind(params.enrollment_number)
    .bind(params.student_name)
    .bind(params.student_email)
    .bind(params.student_phone)
    .bind(params.course)
    .bind(params.branch)
    .bind(params.year_of_study)
    .bind(params.cgpa)
    .bind(Json(params.skills))
    .bind(params.placement_status)
    .bind(params.created_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateStudent,
    now: PrimitiveDateTime,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "UPDATE students SET
            student_name = COALESCE($1, student_name),
            student_email = COALESCE($2, student_email),
            student_phone = COALESCE($3, student_phone),
            course = COALESCE($4, course),
            branch = COALESCE($5, branch),
            year_of_study = COALESCE($6, year_of_study),
            cgpa = COALESCE($7, cgpa),
            skills = COALESCE($8, skills),
            placement_status = COALESCE($9, placement_status),
            updated_at = $10
         WHERE id = $11
         RETURNING {COLUMNS}",
    ))
    .bind(params.student_name)
    .bind(params.student_email)
    .bind(params.student_phone)
    .bind(params.course)
    .bind(params.branch)
    .bind(params.year_of_study)
    .bind(params.cgpa)
    .bind(params.skills.map(Json))
    .bind(params.placement_status)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM students WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM students").fetch_one(pool).await
}

pub(crate) async fn latest(pool: &PgPool) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students ORDER BY created_at DESC LIMIT 1"
    ))
    .fetch_optional(pool)
    .await
}

/// New registrations per calendar month (`YYYY-MM`), oldest first.
pub(crate) async fn monthly_registrations(pool: &PgPool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT to_char(date_trunc('month', created_at), 'YYYY-MM') AS month, COUNT(*)
         FROM students
         GROUP BY 1
         ORDER BY 1 ASC",
    )
    .fetch_all(pool)
    .await
}
