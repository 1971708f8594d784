use serde::Serialize;
use thiserror::Error;

use peoplehub_core::IdentityId;

use crate::{Permission, PermissionCatalog, Portal, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("principal has no resolved role")]
    NoRole,

    #[error("portal mismatch: requires {required}, principal belongs to {actual}")]
    PortalMismatch { required: Portal, actual: Portal },

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorization contract for a gated operation.
///
/// Handlers declare what they need; the API layer checks it before touching
/// any store.
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];

    /// Portal the caller must belong to, if any.
    fn required_portal(&self) -> Option<Portal> {
        None
    }
}

/// Does the principal hold `atom`?
///
/// `true` if the role holds `"*"`, otherwise `true` iff `atom` is literally in
/// the role's set. No prefix or hierarchy expansion happens: `"payroll.manage"`
/// never implies `"payroll.view"`.
///
/// - No IO
/// - No panics
/// - A principal without a role holds nothing
pub fn can(principal: &Principal, atom: &str) -> bool {
    match principal.role() {
        Some(role) => role.grants(atom),
        None => false,
    }
}

/// Does the principal belong to `portal`? Permissions are not consulted.
pub fn require_portal(principal: &Principal, portal: Portal) -> bool {
    principal.role().is_some_and(|r| r.portal == portal)
}

/// [`can`] as a `Result`, for server-side guards.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.role().is_none() {
        return Err(AuthzError::NoRole);
    }

    if can(principal, required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Check a full [`CommandAuthorization`] contract: portal first, then every
/// required permission.
pub fn authorize_command<C: CommandAuthorization + ?Sized>(
    principal: &Principal,
    command: &C,
) -> Result<(), AuthzError> {
    let role = principal.role().ok_or(AuthzError::NoRole)?;

    if let Some(required) = command.required_portal() {
        if role.portal != required {
            return Err(AuthzError::PortalMismatch {
                required,
                actual: role.portal,
            });
        }
    }

    for perm in command.required_permissions() {
        authorize(principal, perm)?;
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    /// The permission that was being checked.
    pub required_permission: String,

    /// Whether the authorization was granted.
    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// Details about the principal's state.
    pub principal: PrincipalState,

    /// If denied, this explains what was missing.
    pub denial_reason: Option<DenialReason>,
}

/// Current state of the principal being checked.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub identity_id: IdentityId,
    pub role: Option<String>,
    pub portal: Option<Portal>,
    pub effective_permissions: Vec<String>,
    pub has_wildcard: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    NoRole,
    MissingPermission,
}

/// Explain why [`can`] returns what it returns.
///
/// `known_roles` is used only to suggest which existing roles would grant the
/// permission; it does not influence the decision. `catalog` keeps the
/// suggestions to atoms that actually exist.
pub fn explain_authorization(
    principal: &Principal,
    required: &Permission,
    catalog: &PermissionCatalog,
    known_roles: &[Role],
) -> AuthorizationExplanation {
    let required_str = required.as_str();
    let state = principal_state(principal);

    let Some(role) = principal.role() else {
        return AuthorizationExplanation {
            required_permission: required_str.to_string(),
            granted: false,
            reason: format!("Identity {} has no resolved role", principal.identity_id),
            principal: state,
            denial_reason: Some(DenialReason {
                kind: DenialKind::NoRole,
                message: "No role is assigned, or the assigned role no longer exists".to_string(),
                suggestions: vec!["Assign a role to this identity".to_string()],
            }),
        };
    };

    if can(principal, required_str) {
        let reason = if role.permissions.has_wildcard() {
            format!("Role '{}' holds the wildcard permission '*'", role.name)
        } else {
            format!("Role '{}' holds '{}' explicitly", role.name, required_str)
        };

        return AuthorizationExplanation {
            required_permission: required_str.to_string(),
            granted: true,
            reason,
            principal: state,
            denial_reason: None,
        };
    }

    let mut granting: Vec<&str> = known_roles
        .iter()
        .filter(|r| r.grants(required_str))
        .map(|r| r.name.as_str())
        .collect();
    granting.sort_unstable();

    let sibling = required
        .resource()
        .map(|resource| format!("{resource}.view"))
        .filter(|atom| atom != required_str && catalog.is_valid(atom));
    let mut suggestions = vec![match sibling {
        Some(atom) => format!(
            "Add '{}' to role '{}' (exact match; related atoms such as '{}' do not imply it)",
            required_str, role.name, atom
        ),
        None => format!("Add '{}' to role '{}'", required_str, role.name),
    }];
    if !granting.is_empty() {
        suggestions.push(format!("Roles that already grant it: {}", granting.join(", ")));
    }

    AuthorizationExplanation {
        required_permission: required_str.to_string(),
        granted: false,
        reason: format!(
            "Role '{}' does not hold '{}'. Current permissions: {:?}",
            role.name, required_str, state.effective_permissions
        ),
        principal: state,
        denial_reason: Some(DenialReason {
            kind: DenialKind::MissingPermission,
            message: format!("Missing required permission: '{}'", required_str),
            suggestions,
        }),
    }
}

fn principal_state(principal: &Principal) -> PrincipalState {
    let role = principal.role();
    PrincipalState {
        identity_id: principal.identity_id,
        role: role.map(|r| r.name.clone()),
        portal: role.map(|r| r.portal),
        effective_permissions: role
            .map(|r| r.permissions.iter().map(|p| p.as_str().to_string()).collect())
            .unwrap_or_default(),
        has_wildcard: role.is_some_and(|r| r.permissions.has_wildcard()),
    }
}
