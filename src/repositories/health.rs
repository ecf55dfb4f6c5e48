use sqlx::PgPool;

/// Round-trips the pool and reports the newest applied migration version.
pub(crate) async fn schema_version(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(MAX(version), 0)::BIGINT FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await
}
