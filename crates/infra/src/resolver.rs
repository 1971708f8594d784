//! Principal resolution: identity -> role snapshot.
//!
//! Resolution runs once per request. The returned [`Principal`] holds a copy
//! of the role as stored at that moment; later role edits show up at the next
//! resolution and never mutate a principal already handed out.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use peoplehub_auth::Principal;
use peoplehub_core::IdentityId;

use crate::role_store::{AccessStore, RoleAssignments, RoleStore, RoleStoreError};

pub struct PrincipalResolver<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for PrincipalResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> PrincipalResolver<S>
where
    S: AccessStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolve `identity_id` at `now`.
    ///
    /// An identity with no assignment, or whose role has vanished, resolves
    /// to a principal without a role. Such a principal is denied by every
    /// check; only storage failures are errors here.
    pub async fn resolve(
        &self,
        identity_id: IdentityId,
        now: DateTime<Utc>,
    ) -> Result<Principal, RoleStoreError> {
        let Some(role_id) = self.store.role_of(identity_id).await? else {
            tracing::debug!(%identity_id, "identity has no role assignment");
            return Ok(Principal::without_role(identity_id, now));
        };

        match self.store.get(role_id).await {
            Ok(role) => Ok(Principal::new(identity_id, role, now)),
            Err(RoleStoreError::NotFound(_)) => {
                tracing::warn!(%identity_id, %role_id, "assigned role is missing; resolving without role");
                Ok(Principal::without_role(identity_id, now))
            }
            Err(e) => Err(e),
        }
    }
}
