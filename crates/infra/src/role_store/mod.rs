//! Role persistence with invariant enforcement.
//!
//! Two traits split the concern the way callers use it:
//! - [`RoleStore`]: CRUD on roles (admin screens);
//! - [`RoleAssignments`]: which role an identity holds (login, user admin).
//!
//! Implementations must make every write all-or-nothing. Name uniqueness and
//! the "no delete while referenced" rule are checked in the same atomic unit
//! as the write itself.

use async_trait::async_trait;
use thiserror::Error;

use peoplehub_auth::{NewRole, Role, RolePatch};
use peoplehub_core::{DomainError, IdentityId, RoleId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryRoleStore;
pub use postgres::PostgresRoleStore;

/// Errors surfaced by role stores.
///
/// The first four map one-to-one onto HTTP 400/403/409/404. `Storage` is an
/// infrastructure failure and is never the client's fault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleStoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<DomainError> for RoleStoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}

impl RoleStoreError {
    pub(crate) fn role_not_found(role_id: RoleId) -> Self {
        Self::NotFound(format!("role {role_id}"))
    }

    pub(crate) fn duplicate_name(name: &str) -> Self {
        Self::Conflict(format!("a role named '{name}' already exists"))
    }
}

/// Outcome of seeding one system role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Created(Role),
    /// A role with that name already existed and was left untouched.
    Existing(Role),
}

impl SeedOutcome {
    pub fn role(&self) -> &Role {
        match self {
            SeedOutcome::Created(r) | SeedOutcome::Existing(r) => r,
        }
    }
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Persist a new client-defined role (`is_system = false`).
    ///
    /// `Validation` for bad input, `Conflict` for a duplicate name. A
    /// wildcard mixed with other atoms is stored as exactly `{"*"}`.
    async fn create(&self, new_role: NewRole) -> Result<Role, RoleStoreError>;

    /// Apply a partial update. `NotFound`, `Forbidden` (system role rename or
    /// `is_system` change), `Validation`, or `Conflict` (name taken).
    async fn update(&self, role_id: RoleId, patch: RolePatch) -> Result<Role, RoleStoreError>;

    /// `Forbidden` for system roles, `Conflict` while any identity references
    /// the role.
    async fn delete(&self, role_id: RoleId) -> Result<(), RoleStoreError>;

    async fn get(&self, role_id: RoleId) -> Result<Role, RoleStoreError>;

    /// All roles, ordered by name.
    async fn list(&self) -> Result<Vec<Role>, RoleStoreError>;

    /// Insert a protected role if no role with that name exists yet.
    async fn seed_system_role(&self, new_role: NewRole) -> Result<SeedOutcome, RoleStoreError>;
}

#[async_trait]
pub trait RoleAssignments: Send + Sync {
    /// Give `identity_id` exactly this role, replacing any previous one.
    /// `NotFound` if the role does not exist.
    async fn assign_role(&self, identity_id: IdentityId, role_id: RoleId) -> Result<(), RoleStoreError>;

    /// Drop the identity's assignment. No-op if it had none.
    async fn unassign(&self, identity_id: IdentityId) -> Result<(), RoleStoreError>;

    async fn role_of(&self, identity_id: IdentityId) -> Result<Option<RoleId>, RoleStoreError>;

    /// Number of identities currently holding `role_id`.
    async fn reference_count(&self, role_id: RoleId) -> Result<u64, RoleStoreError>;

    /// Identities whose assigned role grants `atom`, by the same exact-match
    /// rule as `can` (a wildcard role grants everything). Used to find who
    /// can act on something, e.g. the `leave.manage` approvers. Ordered by id.
    async fn identities_with_permission(&self, atom: &str) -> Result<Vec<IdentityId>, RoleStoreError>;
}

/// Everything the API needs from one backing store.
pub trait AccessStore: RoleStore + RoleAssignments {}

impl<T> AccessStore for T where T: RoleStore + RoleAssignments {}
