use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Organization;
use crate::db::types::OrganizationType;

pub(crate) const COLUMNS: &str = "\
    id, name, type, domain, contact_email, contact_phone, address, \
    is_active, settings, created_at, updated_at";

pub(crate) struct CreateOrganization<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) org_type: OrganizationType,
    pub(crate) domain: Option<&'a str>,
    pub(crate) contact_email: Option<&'a str>,
    pub(crate) contact_phone: Option<&'a str>,
    pub(crate) address: serde_json::Value,
    pub(crate) settings: serde_json::Value,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Default)]
pub(crate) struct UpdateOrganization {
    pub(crate) name: Option<String>,
    pub(crate) domain: Option<String>,
    pub(crate) contact_email: Option<String>,
    pub(crate) contact_phone: Option<String>,
    pub(crate) address: Option<serde_json::Value>,
    pub(crate) settings: Option<serde_json::Value>,
    pub(crate) is_active: Option<bool>,
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>(&format!("SELECT {COLUMNS} FROM organizations WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    org_type: Option<OrganizationType>,
    active_only: bool,
) -> Result<Vec<Organization>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM organizations WHERE TRUE"));

    if let Some(org_type) = org_type {
        builder.push(" AND type = ");
        builder.push_bind(org_type);
    }
    if active_only {
        builder.push(" AND is_active");
    }

    builder.push(" ORDER BY name ASC");
    builder.build_query_as::<Organization>().fetch_all(pool).await
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateOrganization<'_>,
) -> Result<Organization, sqlx::Error> {
    sqlx::query_as::<_, Organization>(&format!(
        "INSERT INTO organizations (
            id, name, type, domain, contact_email, contact_phone, address,
            is_active, settings, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$10)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.org_type)
    .bind(params.domain)
    .bind(params.contact_email)
    .bind(params.contact_phone)
    .bind(Json(params.address))
    .bind(params.is_active)
    .bind(Json(params.settings))
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateOrganization,
    now: PrimitiveDateTime,
) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>(&format!(
        "UPDATE organizations SET
            name = COALESCE($1, name),
            domain = COALESCE($2, domain),
            contact_email = COALESCE($3, contact_email),
            contact_phone = COALESCE($4, contact_phone),
            address = COALESCE($5, address),
            settings = COALESCE($6, settings),
            is_active = COALESCE($7, is_active),
            updated_at = $8
         WHERE id = $9
         RETURNING {COLUMNS}",
    ))
    .bind(params.name)
    .bind(params.domain)
    .bind(params.contact_email)
    .bind(params.contact_phone)
    .bind(params.address.map(Json))
    .bind(params.settings.map(Json))
    .bind(params.is_active)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM organizations WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
