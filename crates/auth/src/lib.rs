//! `peoplehub-auth`: role/permission model and pure authorization decisions.
//!
//! This crate is intentionally decoupled from HTTP and storage: it validates
//! roles, evaluates `can`/`require_portal`, and routes principals to portals.

pub mod authorize;
pub mod catalog;
pub mod claims;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod router;

pub use authorize::{
    AuthorizationExplanation, AuthzError, CommandAuthorization, authorize, authorize_command, can,
    explain_authorization, require_portal,
};
pub use catalog::{CATALOG_VERSION, PermissionCatalog, PermissionGroup};
pub use claims::{Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError, validate_claims};
pub use permissions::{Permission, WILDCARD};
pub use principal::Principal;
pub use roles::{NewRole, PermissionSet, Portal, Role, RolePatch, apply_toggle};
pub use router::{RouteDecision, RouteError};
