use chrono::{DateTime, Utc};
use serde::Serialize;

use peoplehub_core::IdentityId;

use crate::roles::Role;

/// A fully resolved principal for authorization decisions.
///
/// The role is a **snapshot** taken at resolution time. Edits to the stored
/// role are picked up at the next resolution (the next request), never by
/// mutating an existing `Principal`. Pass it explicitly through handlers;
/// there is no process-wide "current role".
///
/// `role` is `None` when the identity's role could not be loaded (never
/// assigned, or deleted underneath a stale reference). Every decision made on
/// such a principal denies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub identity_id: IdentityId,
    pub role: Option<Role>,
    pub resolved_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(identity_id: IdentityId, role: Role, resolved_at: DateTime<Utc>) -> Self {
        Self {
            identity_id,
            role: Some(role),
            resolved_at,
        }
    }

    pub fn without_role(identity_id: IdentityId, resolved_at: DateTime<Utc>) -> Self {
        Self {
            identity_id,
            role: None,
            resolved_at,
        }
    }

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.name.as_str())
    }
}
