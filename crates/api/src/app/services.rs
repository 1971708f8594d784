//! Shared handler dependencies.

use std::sync::Arc;

use peoplehub_auth::{PermissionCatalog, Role};
use peoplehub_infra::{AccessStore, RoleStoreError, seed_system_roles};

pub struct AppServices {
    pub store: Arc<dyn AccessStore>,
    pub catalog: &'static PermissionCatalog,
}

impl AppServices {
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self {
            store,
            catalog: PermissionCatalog::standard(),
        }
    }

    /// Idempotently create the protected system roles.
    pub async fn seed(&self) -> Result<Vec<Role>, RoleStoreError> {
        seed_system_roles(self.store.as_ref()).await
    }
}
