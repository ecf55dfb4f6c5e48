use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Profile;
use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProfileCreate {
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[serde(alias = "fullName", alias = "name")]
    #[validate(length(min = 1, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters long"))]
    pub(crate) password: String,
    #[serde(default = "default_role")]
    pub(crate) role: UserRole,
    #[serde(default, alias = "organizationId")]
    pub(crate) organization_id: Option<String>,
    #[serde(default)]
    pub(crate) phone: Option<String>,
    #[serde(default = "default_true", alias = "isActive")]
    pub(crate) is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct ProfileUpdate {
    #[serde(default, alias = "fullName", alias = "name")]
    #[validate(length(min = 1, message = "full_name must not be empty"))]
    pub(crate) full_name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 8, message = "password must be at least 8 characters long"))]
    pub(crate) password: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
    #[serde(default, alias = "organizationId")]
    pub(crate) organization_id: Option<String>,
    #[serde(default)]
    pub(crate) phone: Option<String>,
    #[serde(default, alias = "isActive")]
    pub(crate) is_active: Option<bool>,
    #[serde(default)]
    pub(crate) preferences: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileListQuery {
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfileResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) organization_id: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) preferences: serde_json::Value,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ProfileResponse {
    pub(crate) fn from_db(profile: Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            role: profile.role,
            organization_id: profile.organization_id,
            phone: profile.phone,
            is_active: profile.is_active,
            preferences: profile.preferences.0,
            created_at: format_primitive(profile.created_at),
            updated_at: format_primitive(profile.updated_at),
        }
    }
}

fn default_role() -> UserRole {
    UserRole::Student
}

fn default_true() -> bool {
    true
}
