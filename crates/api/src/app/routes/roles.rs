//! Role administration endpoints.
//!
//! Every route here requires the Admin portal and `roles.manage`. The check
//! runs before the store is touched.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use peoplehub_auth::{Permission, Principal, RolePatch, apply_toggle};
use peoplehub_infra::RoleStore;

use crate::app::routes::common::CmdAuth;
use crate::app::{dto, errors, services::AppServices};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_role).get(list_roles))
        .route("/:id", get(get_role).patch(update_role).delete(delete_role))
        .route("/:id/permissions/toggle", post(toggle_permission))
}

/// POST /roles - create a client-defined role (`is_system` is always false).
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<dto::CreateRoleRequest>,
) -> axum::response::Response {
    let cmd_auth = CmdAuth::manage_roles(body);
    if let Err(resp) = authz::authorize_command(&principal, &cmd_auth) {
        return resp;
    }

    let new_role = match cmd_auth.inner.into_new_role() {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.store.create(new_role).await {
        Ok(role) => {
            tracing::info!(
                role_id = %role.role_id,
                name = %role.name,
                by = %principal.identity_id,
                "role created"
            );
            (StatusCode::CREATED, Json(dto::role_to_json(&role))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> axum::response::Response {
    if let Err(resp) = authz::authorize_command(&principal, &CmdAuth::manage_roles(())) {
        return resp;
    }

    match services.store.list().await {
        Ok(roles) => {
            let items = roles.iter().map(dto::role_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::authorize_command(&principal, &CmdAuth::manage_roles(())) {
        return resp;
    }

    let role_id = match errors::parse_role_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store.get(role_id).await {
        Ok(role) => (StatusCode::OK, Json(dto::role_to_json(&role))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// PATCH /roles/:id - partial update.
pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateRoleRequest>,
) -> axum::response::Response {
    let cmd_auth = CmdAuth::manage_roles(body);
    if let Err(resp) = authz::authorize_command(&principal, &cmd_auth) {
        return resp;
    }

    let role_id = match errors::parse_role_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let patch = match cmd_auth.inner.into_patch() {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.store.update(role_id, patch).await {
        Ok(role) => {
            tracing::info!(role_id = %role.role_id, name = %role.name, by = %principal.identity_id, "role updated");
            (StatusCode::OK, Json(dto::role_to_json(&role))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::authorize_command(&principal, &CmdAuth::manage_roles(())) {
        return resp;
    }

    let role_id = match errors::parse_role_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store.delete(role_id).await {
        Ok(()) => {
            tracing::info!(%role_id, by = %principal.identity_id, "role deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /roles/:id/permissions/toggle - one checkbox click in the role editor.
///
/// Read-modify-write: two concurrent toggles on the same role resolve as
/// last writer wins.
pub async fn toggle_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<dto::TogglePermissionRequest>,
) -> axum::response::Response {
    let cmd_auth = CmdAuth::manage_roles(body);
    if let Err(resp) = authz::authorize_command(&principal, &cmd_auth) {
        return resp;
    }

    let role_id = match errors::parse_role_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let toggle = cmd_auth.inner;
    let atom = Permission::new(toggle.permission);
    if !services.catalog.is_valid(atom.as_str()) {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("unknown permission '{}'", atom.as_str()),
        );
    }

    let current = match services.store.get(role_id).await {
        Ok(role) => role,
        Err(e) => return errors::store_error_to_response(e),
    };

    let next = apply_toggle(&current.permissions, &atom, toggle.checked);
    let patch = RolePatch::permissions(next.iter().cloned());

    match services.store.update(role_id, patch).await {
        Ok(role) => {
            tracing::info!(
                %role_id,
                permission = %atom,
                checked = toggle.checked,
                by = %principal.identity_id,
                "role permission toggled"
            );
            (StatusCode::OK, Json(dto::role_to_json(&role))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
