use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Organization;
use crate::db::types::OrganizationType;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct OrganizationCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) org_type: OrganizationType,
    #[serde(default)]
    pub(crate) domain: Option<String>,
    #[serde(default, alias = "contactEmail")]
    #[validate(email(message = "contact_email must be a valid address"))]
    pub(crate) contact_email: Option<String>,
    #[serde(default, alias = "contactPhone")]
    pub(crate) contact_phone: Option<String>,
    #[serde(default = "empty_object")]
    pub(crate) address: serde_json::Value,
    #[serde(default = "empty_object")]
    pub(crate) settings: serde_json::Value,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct OrganizationUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) domain: Option<String>,
    #[serde(default, alias = "contactEmail")]
    #[validate(email(message = "contact_email must be a valid address"))]
    pub(crate) contact_email: Option<String>,
    #[serde(default, alias = "contactPhone")]
    pub(crate) contact_phone: Option<String>,
    #[serde(default)]
    pub(crate) address: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) settings: Option<serde_json::Value>,
    #[serde(default, alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrganizationListQuery {
    #[serde(default, rename = "type")]
    pub(crate) org_type: Option<OrganizationType>,
    #[serde(default)]
    pub(crate) active: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrganizationResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) org_type: OrganizationType,
    pub(crate) domain: Option<String>,
    pub(crate) contact_email: Option<String>,
    pub(crate) contact_phone: Option<String>,
    pub(crate) address: serde_json::Value,
    pub(crate) is_active: bool,
    pub(crate) settings: serde_json::Value,
    pub(crate) created_at: String,
}

impl OrganizationResponse {
    pub(crate) fn from_db(organization: Organization) -> Self {
        Self {
            id: organization.id,
            name: organization.name,
            org_type: organization.org_type,
            domain: organization.domain,
            contact_email: organization.contact_email,
            contact_phone: organization.contact_phone,
            address: organization.address.0,
            is_active: organization.is_active,
            settings: organization.settings.0,
            created_at: format_primitive(organization.created_at),
        }
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}
