use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use peoplehub_auth::{Principal, router as portal_router};

use crate::app::{dto, errors};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// The resolved principal, including a role-less one, so a client can tell
/// "not assigned" apart from "not authenticated".
pub async fn whoami(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(dto::principal_to_json(&principal))
}

/// Where this principal lands after login.
pub async fn portal(Extension(principal): Extension<Principal>) -> axum::response::Response {
    match portal_router::decide(&principal) {
        Ok(decision) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "portal": decision.portal.as_str(),
                "landing_path": decision.landing_path,
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(identity_id = %principal.identity_id, reason = %e, "portal routing denied");
            errors::route_error_to_response(e)
        }
    }
}

/// Gate entry to a named portal surface.
pub async fn enter_portal(
    Extension(principal): Extension<Principal>,
    Path(name): Path<String>,
) -> axum::response::Response {
    match portal_router::enter(&principal, &name) {
        Ok(portal) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "portal": portal.as_str(),
                "landing_path": portal.landing_path(),
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(identity_id = %principal.identity_id, requested = %name, reason = %e, "portal entry denied");
            errors::route_error_to_response(e)
        }
    }
}
