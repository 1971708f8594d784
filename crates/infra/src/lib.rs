//! Infrastructure layer: role persistence, seeding, principal resolution.

pub mod resolver;
pub mod role_store;
pub mod seed;

pub use resolver::PrincipalResolver;
pub use role_store::{
    AccessStore, InMemoryRoleStore, PostgresRoleStore, RoleAssignments, RoleStore, RoleStoreError,
    SeedOutcome,
};
pub use seed::{seed_system_roles, system_role_definitions};
