use axum::http::StatusCode;
use serde::{Deserialize, Deserializer};

use peoplehub_auth::{NewRole, Permission, Portal, PermissionCatalog, Principal, Role, RolePatch};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub portal: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Absent fields are left untouched; `"description": null` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub portal: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(default)]
    pub is_system: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TogglePermissionRequest {
    pub permission: String,
    pub checked: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: String,
}

/// `?permission=<atom>` on the explain and holder-lookup endpoints.
#[derive(Debug, Deserialize)]
pub struct PermissionQuery {
    pub permission: String,
}

/// Distinguish a field sent as `null` from one not sent at all.
fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

// -------------------------
// Mapping
// -------------------------

pub fn parse_portal(raw: &str) -> Result<Portal, axum::response::Response> {
    raw.parse::<Portal>()
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()))
}

fn to_permissions(raw: Vec<String>) -> Vec<Permission> {
    raw.into_iter().map(Permission::new).collect()
}

impl CreateRoleRequest {
    pub fn into_new_role(self) -> Result<NewRole, axum::response::Response> {
        let portal = parse_portal(&self.portal)?;
        let mut new_role = NewRole::new(self.name, portal, to_permissions(self.permissions));
        new_role.description = self.description;
        Ok(new_role)
    }
}

impl UpdateRoleRequest {
    pub fn into_patch(self) -> Result<RolePatch, axum::response::Response> {
        let portal = self.portal.as_deref().map(parse_portal).transpose()?;
        Ok(RolePatch {
            name: self.name,
            description: self.description,
            portal,
            permissions: self.permissions.map(to_permissions),
            is_system: self.is_system,
        })
    }
}

pub fn role_to_json(role: &Role) -> serde_json::Value {
    serde_json::json!({
        "role_id": role.role_id.to_string(),
        "name": role.name,
        "description": role.description,
        "portal": role.portal.as_str(),
        "permissions": role.permissions.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        "is_system": role.is_system,
        "created_at": role.created_at.to_rfc3339(),
        "updated_at": role.updated_at.to_rfc3339(),
    })
}

pub fn catalog_to_json(catalog: &PermissionCatalog) -> serde_json::Value {
    let groups = catalog
        .list_groups()
        .iter()
        .map(|g| {
            serde_json::json!({
                "label": g.label,
                "atoms": g.atoms.iter().map(|a| a.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();

    serde_json::json!({
        "version": catalog.version(),
        "groups": groups,
    })
}

pub fn principal_to_json(principal: &Principal) -> serde_json::Value {
    let role = principal.role();
    serde_json::json!({
        "identity_id": principal.identity_id.to_string(),
        "role": role.map(|r| r.name.as_str()),
        "role_id": role.map(|r| r.role_id.to_string()),
        "portal": role.map(|r| r.portal.as_str()),
        "permissions": role
            .map(|r| r.permissions.iter().map(|p| p.as_str()).collect::<Vec<_>>())
            .unwrap_or_default(),
        "resolved_at": principal.resolved_at.to_rfc3339(),
    })
}
