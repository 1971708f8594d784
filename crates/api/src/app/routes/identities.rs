//! Identity-to-role assignment.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use peoplehub_auth::Principal;
use peoplehub_infra::{RoleAssignments, RoleStore};

use crate::app::routes::common::CmdAuth;
use crate::app::{dto, errors, services::AppServices};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", get(holders_of_permission))
        .route("/:id/role", put(assign_role).get(get_assignment).delete(unassign_role))
}

/// GET /identities?permission=X - identities whose role grants X, e.g. the
/// people who can approve leave (`leave.manage`).
pub async fn holders_of_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<dto::PermissionQuery>,
) -> axum::response::Response {
    let cmd_auth = CmdAuth::manage_roles(query);
    if let Err(resp) = authz::authorize_command(&principal, &cmd_auth) {
        return resp;
    }

    let atom = cmd_auth.inner.permission;
    if !services.catalog.is_valid(&atom) {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("unknown permission '{atom}'"),
        );
    }

    match services.store.identities_with_permission(&atom).await {
        Ok(ids) => {
            let items = ids.iter().map(ToString::to_string).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "permission": atom, "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// PUT /identities/:id/role - give the identity exactly this role.
pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<dto::AssignRoleRequest>,
) -> axum::response::Response {
    let cmd_auth = CmdAuth::manage_roles(body);
    if let Err(resp) = authz::authorize_command(&principal, &cmd_auth) {
        return resp;
    }

    let identity_id = match errors::parse_identity_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let role_id = match errors::parse_role_id(&cmd_auth.inner.role_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if let Err(e) = services.store.assign_role(identity_id, role_id).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(%identity_id, %role_id, by = %principal.identity_id, "role assigned");
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "identity_id": identity_id.to_string(),
            "role_id": role_id.to_string(),
        })),
    )
        .into_response()
}

pub async fn get_assignment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::authorize_command(&principal, &CmdAuth::manage_roles(())) {
        return resp;
    }

    let identity_id = match errors::parse_identity_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let role_id = match services.store.role_of(identity_id).await {
        Ok(Some(role_id)) => role_id,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "identity has no role assignment");
        }
        Err(e) => return errors::store_error_to_response(e),
    };

    match services.store.get(role_id).await {
        Ok(role) => (StatusCode::OK, Json(dto::role_to_json(&role))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn unassign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::authorize_command(&principal, &CmdAuth::manage_roles(())) {
        return resp;
    }

    let identity_id = match errors::parse_identity_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.store.unassign(identity_id).await {
        Ok(()) => {
            tracing::info!(%identity_id, by = %principal.identity_id, "role unassigned");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
