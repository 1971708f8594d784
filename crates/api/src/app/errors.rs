use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use peoplehub_auth::{AuthzError, RouteError};
use peoplehub_core::{IdentityId, RoleId};
use peoplehub_infra::RoleStoreError;

pub fn store_error_to_response(err: RoleStoreError) -> axum::response::Response {
    match err {
        RoleStoreError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        RoleStoreError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        RoleStoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        RoleStoreError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        RoleStoreError::Storage(msg) => {
            tracing::error!(error = %msg, "role store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal storage error")
        }
    }
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    let code = match &err {
        AuthzError::NoRole => "no_role",
        AuthzError::PortalMismatch { .. } => "portal_mismatch",
        AuthzError::Forbidden(_) => "forbidden",
    };
    json_error(StatusCode::FORBIDDEN, code, err.to_string())
}

/// Every routing failure denies; none of them falls back to a default portal.
pub fn route_error_to_response(err: RouteError) -> axum::response::Response {
    let code = match &err {
        RouteError::NoRole => "no_role",
        RouteError::UnrecognizedPortal(_) => "unrecognized_portal",
        RouteError::Forbidden { .. } => "forbidden",
    };
    json_error(StatusCode::FORBIDDEN, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_role_id(s: &str) -> Result<RoleId, axum::response::Response> {
    s.parse::<RoleId>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid role id"))
}

pub fn parse_identity_id(s: &str) -> Result<IdentityId, axum::response::Response> {
    s.parse::<IdentityId>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid identity id"))
}
