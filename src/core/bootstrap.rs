use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::profiles::{CreateProfile, UpdateProfile};

/// Creates the configured super administrator, or repairs its password,
/// role and activation when they drifted.
pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let email = admin.first_superuser_email.trim().to_lowercase();
    let now = primitive_now_utc();

    if let Some(profile) = repositories::profiles::find_by_email(state.db(), &email).await? {
        let verified =
            security::verify_password(&admin.first_superuser_password, &profile.hashed_password)
                .unwrap_or(false);

        let mut update = UpdateProfile::default();
        if !verified {
            update.hashed_password = Some(security::hash_password(&admin.first_superuser_password)?);
        }
        if profile.role != UserRole::SuperAdmin {
            update.role = Some(UserRole::SuperAdmin);
        }
        if !profile.is_active {
            update.is_active = Some(true);
        }

        let needs_update =
            update.hashed_password.is_some() || update.role.is_some() || update.is_active.is_some();
        if needs_update {
            repositories::profiles::update(state.db(), &profile.id, update, now).await?;
            tracing::info!(email = %email, "Updated default superuser");
        } else {
            tracing::info!("Default superuser already up to date");
        }

        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_superuser_password)?;
    repositories::profiles::create(
        state.db(),
        CreateProfile {
            id: &Uuid::new_v4().to_string(),
            email: &email,
            full_name: "Super Admin",
            role: UserRole::SuperAdmin,
            organization_id: None,
            phone: None,
            hashed_password,
            is_active: true,
            created_at: now,
        },
    )
    .await?;

    tracing::info!(email = %email, "Created default superuser");
    Ok(())
}
