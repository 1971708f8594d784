//! Authorization audit endpoint for "why was this request denied?" questions.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use peoplehub_auth::{Permission, Principal, can, explain_authorization, permissions::roles};
use peoplehub_infra::RoleStore;

use crate::app::routes::common::CmdAuth;
use crate::app::{dto, errors, services::AppServices};
use crate::authz;

/// GET /authz/explain?permission=X - explain the caller's own decision for X.
///
/// Admin portal only. Other roles are named in the suggestions only when the
/// caller may manage roles.
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<dto::PermissionQuery>,
) -> axum::response::Response {
    let cmd_auth = CmdAuth::admin_portal(query);
    if let Err(resp) = authz::authorize_command(&principal, &cmd_auth) {
        return resp;
    }

    let known_roles = if can(&principal, roles::MANAGE.as_str()) {
        match services.store.list().await {
            Ok(all) => all,
            Err(e) => return errors::store_error_to_response(e),
        }
    } else {
        Vec::new()
    };

    let required = Permission::new(cmd_auth.inner.permission);
    let explanation = explain_authorization(&principal, &required, services.catalog, &known_roles);

    (StatusCode::OK, Json(serde_json::json!({ "explanation": explanation }))).into_response()
}
