//! API-side authorization guard for commands.
//!
//! This enforces authorization at the command boundary, before any store is
//! touched, against the principal resolved for this request.

use peoplehub_auth::{CommandAuthorization, Principal};

use crate::app::errors;

/// Check authorization for a command in the current request context.
///
/// Denials are logged and returned as a ready-made `403` response.
pub fn authorize_command<C: CommandAuthorization>(
    principal: &Principal,
    command: &C,
) -> Result<(), axum::response::Response> {
    peoplehub_auth::authorize_command(principal, command).map_err(|e| {
        tracing::warn!(
            identity_id = %principal.identity_id,
            role = principal.role_name().unwrap_or("<none>"),
            reason = %e,
            "authorization denied"
        );
        errors::authz_error_to_response(e)
    })
}
