use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Profile;
use crate::db::types::UserRole;

pub(crate) const COLUMNS: &str = "\
    id, email, full_name, role, organization_id, phone, hashed_password, \
    is_active, preferences, created_at, updated_at";

pub(crate) struct CreateProfile<'a> {
    pub(crate) id: &'a str,
    pub(crate) email: &'a str,
    pub(crate) full_name: &'a str,
    pub(crate) role: UserRole,
    pub(crate) organization_id: Option<&'a str>,
    pub(crate) phone: Option<&'a str>,
    pub(crate) hashed_password: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Default)]
pub(crate) struct UpdateProfile {
    pub(crate) full_name: Option<String>,
    pub(crate) role: Option<UserRole>,
    pub(crate) organization_id: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) hashed_password: Option<String>,
    pub(crate) is_active: Option<bool>,
    pub(crate) preferences: Option<serde_json::Value>,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!("SELECT {COLUMNS} FROM profiles WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {COLUMNS} FROM profiles WHERE lower(email) = lower($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    role: Option<UserRole>,
    search: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Profile>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM profiles WHERE TRUE"));
    push_filters(&mut builder, role, search);

    builder.push(" ORDER BY created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Profile>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    role: Option<UserRole>,
    search: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM profiles WHERE TRUE");
    push_filters(&mut builder, role, search);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    role: Option<UserRole>,
    search: Option<&str>,
) {
    if let Some(role) = role {
        builder.push(" AND role = ");
        builder.push_bind(role);
    }
    super::push_search(builder, &["full_name", "email"], search);
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateProfile<'_>,
) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "INSERT INTO profiles (
            id, email, full_name, role, organization_id, phone, hashed_password,
            is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.email)
    .bind(params.full_name)
    .bind(params.role)
    .bind(params.organization_id)
    .bind(params.phone)
    .bind(params.hashed_password)
    .bind(params.is_active)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateProfile,
    now: PrimitiveDateTime,
) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "UPDATE profiles SET
            full_name = COALESCE($1, full_name),
            role = COALESCE($2, role),
            organization_id = COALESCE($3, organization_id),
            phone = COALESCE($4, phone),
            hashed_password = COALESCE($5, hashed_password),
            is_active = COALESCE($6, is_active),
            preferences = COALESCE($7, preferences),
            updated_at = $8
         WHERE id = $9
         RETURNING {COLUMNS}",
    ))
    .bind(params.full_name)
    .bind(params.role)
    .bind(params.organization_id)
    .bind(params.phone)
    .bind(params.hashed_password)
    .bind(params.is_active)
    .bind(params.preferences.map(Json))
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM profiles WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
