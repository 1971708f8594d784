use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use peoplehub_auth::{NewRole, PermissionCatalog, Role, RolePatch};
use peoplehub_core::{Entity, IdentityId, RoleId};

use super::{RoleAssignments, RoleStore, RoleStoreError, SeedOutcome};

#[derive(Debug, Default)]
struct State {
    roles: HashMap<RoleId, Role>,
    /// Unique index on `name`.
    names: HashMap<String, RoleId>,
    assignments: HashMap<IdentityId, RoleId>,
}

impl State {
    fn references(&self, role_id: RoleId) -> u64 {
        self.assignments.values().filter(|r| **r == role_id).count() as u64
    }

    fn insert(&mut self, role: Role) -> Result<Role, RoleStoreError> {
        if self.names.contains_key(&role.name) {
            return Err(RoleStoreError::duplicate_name(&role.name));
        }
        self.names.insert(role.name.clone(), *role.id());
        self.roles.insert(*role.id(), role.clone());
        Ok(role)
    }
}

/// In-memory role store for tests/dev.
///
/// A single `RwLock` covers roles, the name index and assignments, so every
/// check-then-write runs under one write guard.
#[derive(Debug)]
pub struct InMemoryRoleStore {
    catalog: Arc<PermissionCatalog>,
    inner: RwLock<State>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(PermissionCatalog::standard().clone()))
    }

    pub fn with_catalog(catalog: Arc<PermissionCatalog>) -> Self {
        Self {
            catalog,
            inner: RwLock::new(State::default()),
        }
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, RoleStoreError> {
        self.inner
            .write()
            .map_err(|_| RoleStoreError::Storage("role store lock poisoned".to_string()))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, RoleStoreError> {
        self.inner
            .read()
            .map_err(|_| RoleStoreError::Storage("role store lock poisoned".to_string()))
    }
}

impl Default for InMemoryRoleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn create(&self, new_role: NewRole) -> Result<Role, RoleStoreError> {
        let role = new_role.validate(&self.catalog, RoleId::new(), false, Utc::now())?;
        let mut state = self.write()?;
        let role = state.insert(role)?;
        tracing::debug!(role_id = %role.role_id, name = %role.name, "role created");
        Ok(role)
    }

    async fn update(&self, role_id: RoleId, patch: RolePatch) -> Result<Role, RoleStoreError> {
        let mut state = self.write()?;
        let current = state
            .roles
            .get(&role_id)
            .ok_or_else(|| RoleStoreError::role_not_found(role_id))?;

        let updated = current.patched(&patch, &self.catalog, Utc::now())?;

        if updated.name != current.name {
            if state.names.contains_key(&updated.name) {
                return Err(RoleStoreError::duplicate_name(&updated.name));
            }
            let old_name = current.name.clone();
            state.names.remove(&old_name);
            state.names.insert(updated.name.clone(), role_id);
        }
        state.roles.insert(role_id, updated.clone());

        tracing::debug!(role_id = %role_id, name = %updated.name, "role updated");
        Ok(updated)
    }

    async fn delete(&self, role_id: RoleId) -> Result<(), RoleStoreError> {
        let mut state = self.write()?;
        let role = state
            .roles
            .get(&role_id)
            .ok_or_else(|| RoleStoreError::role_not_found(role_id))?;

        if role.is_system {
            return Err(RoleStoreError::Forbidden(format!(
                "system role '{}' cannot be deleted",
                role.name
            )));
        }

        let refs = state.references(role_id);
        if refs > 0 {
            return Err(RoleStoreError::Conflict(format!(
                "role '{}' is still assigned to {refs} identit{}",
                role.name,
                if refs == 1 { "y" } else { "ies" }
            )));
        }

        let name = role.name.clone();
        state.names.remove(&name);
        state.roles.remove(&role_id);

        tracing::debug!(role_id = %role_id, name = %name, "role deleted");
        Ok(())
    }

    async fn get(&self, role_id: RoleId) -> Result<Role, RoleStoreError> {
        self.read()?
            .roles
            .get(&role_id)
            .cloned()
            .ok_or_else(|| RoleStoreError::role_not_found(role_id))
    }

    async fn list(&self) -> Result<Vec<Role>, RoleStoreError> {
        let mut roles: Vec<Role> = self.read()?.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn seed_system_role(&self, new_role: NewRole) -> Result<SeedOutcome, RoleStoreError> {
        let role = new_role.validate(&self.catalog, RoleId::new(), true, Utc::now())?;
        let mut state = self.write()?;

        if let Some(existing) = state.names.get(&role.name).and_then(|id| state.roles.get(id)) {
            return Ok(SeedOutcome::Existing(existing.clone()));
        }
        Ok(SeedOutcome::Created(state.insert(role)?))
    }
}

#[async_trait]
impl RoleAssignments for InMemoryRoleStore {
    async fn assign_role(&self, identity_id: IdentityId, role_id: RoleId) -> Result<(), RoleStoreError> {
        let mut state = self.write()?;
        if !state.roles.contains_key(&role_id) {
            return Err(RoleStoreError::role_not_found(role_id));
        }
        state.assignments.insert(identity_id, role_id);
        Ok(())
    }

    async fn unassign(&self, identity_id: IdentityId) -> Result<(), RoleStoreError> {
        self.write()?.assignments.remove(&identity_id);
        Ok(())
    }

    async fn role_of(&self, identity_id: IdentityId) -> Result<Option<RoleId>, RoleStoreError> {
        Ok(self.read()?.assignments.get(&identity_id).copied())
    }

    async fn reference_count(&self, role_id: RoleId) -> Result<u64, RoleStoreError> {
        Ok(self.read()?.references(role_id))
    }

    async fn identities_with_permission(&self, atom: &str) -> Result<Vec<IdentityId>, RoleStoreError> {
        let state = self.read()?;
        let mut identities: Vec<IdentityId> = state
            .assignments
            .iter()
            .filter(|(_, role_id)| state.roles.get(*role_id).is_some_and(|r| r.grants(atom)))
            .map(|(identity_id, _)| *identity_id)
            .collect();
        identities.sort_unstable();
        Ok(identities)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use peoplehub_auth::{Permission, PermissionSet, Portal};

    use super::*;

    fn p(s: &'static str) -> Permission {
        Permission::from_static(s)
    }

    fn payroll_officer() -> NewRole {
        NewRole::new(
            "Payroll Officer",
            Portal::Admin,
            [p("payroll.view"), p("payroll.manage"), p("claims.view"), p("claims.manage")],
        )
    }

    async fn seeded_employee(store: &InMemoryRoleStore) -> Role {
        store
            .seed_system_role(NewRole::new(
                "Employee",
                Portal::Employee,
                [p("portal.employee"), p("leave.self"), p("attendance.self"), p("payroll.self")],
            ))
            .await
            .unwrap()
            .role()
            .clone()
    }

    #[tokio::test]
    async fn create_then_get_and_list() {
        let store = InMemoryRoleStore::new();
        let role = store.create(payroll_officer()).await.unwrap();

        assert!(!role.is_system);
        assert_eq!(store.get(role.role_id).await.unwrap(), role);
        assert_eq!(store.list().await.unwrap(), vec![role]);
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let store = InMemoryRoleStore::new();
        store.create(payroll_officer()).await.unwrap();

        let err = store.create(payroll_officer()).await.unwrap_err();
        assert!(matches!(err, RoleStoreError::Conflict(_)));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_creates_yield_exactly_one_winner() {
        let store = Arc::new(InMemoryRoleStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(NewRole::new("X", Portal::Employee, [])).await
            }));
        }

        let mut ok = 0;
        let mut conflicts = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(RoleStoreError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 15);
    }

    #[tokio::test]
    async fn create_collapses_wildcard() {
        let store = InMemoryRoleStore::new();
        let role = store
            .create(NewRole::new("Super", Portal::Admin, [p("leave.view"), p("*")]))
            .await
            .unwrap();
        assert_eq!(role.permissions, PermissionSet::wildcard());
    }

    #[tokio::test]
    async fn create_rejects_unknown_atom_without_writing() {
        let store = InMemoryRoleStore::new();
        let err = store
            .create(NewRole::new("Odd", Portal::Admin, [p("payroll.view"), p("payroll.*")]))
            .await
            .unwrap_err();
        assert!(matches!(err, RoleStoreError::Validation(_)));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn system_role_rename_and_delete_are_forbidden() {
        let store = InMemoryRoleStore::new();
        let employee = seeded_employee(&store).await;

        let err = store.update(employee.role_id, RolePatch::rename("X")).await.unwrap_err();
        assert!(matches!(err, RoleStoreError::Forbidden(_)));

        let err = store.delete(employee.role_id).await.unwrap_err();
        assert!(matches!(err, RoleStoreError::Forbidden(_)));

        assert_eq!(store.get(employee.role_id).await.unwrap(), employee);
    }

    #[tokio::test]
    async fn system_role_permissions_remain_editable() {
        let store = InMemoryRoleStore::new();
        let employee = seeded_employee(&store).await;

        let updated = store
            .update(employee.role_id, RolePatch::permissions([p("portal.employee")]))
            .await
            .unwrap();
        assert_eq!(updated.permissions.len(), 1);
        assert!(updated.is_system);
        assert_eq!(updated.name, "Employee");
    }

    #[tokio::test]
    async fn rename_into_taken_name_conflicts_and_leaves_state() {
        let store = InMemoryRoleStore::new();
        store.create(payroll_officer()).await.unwrap();
        let other = store.create(NewRole::new("Recruiter", Portal::Admin, [])).await.unwrap();

        let err = store
            .update(other.role_id, RolePatch::rename("Payroll Officer"))
            .await
            .unwrap_err();
        assert!(matches!(err, RoleStoreError::Conflict(_)));
        assert_eq!(store.get(other.role_id).await.unwrap().name, "Recruiter");
    }

    #[tokio::test]
    async fn rename_frees_old_name() {
        let store = InMemoryRoleStore::new();
        let role = store.create(payroll_officer()).await.unwrap();
        store.update(role.role_id, RolePatch::rename("Payroll Lead")).await.unwrap();

        store.create(payroll_officer()).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_update_is_all_or_nothing() {
        let store = InMemoryRoleStore::new();
        let role = store.create(payroll_officer()).await.unwrap();

        let patch = RolePatch {
            name: Some("Payroll Lead".into()),
            permissions: Some(vec![p("payroll.audit")]),
            ..RolePatch::default()
        };
        let err = store.update(role.role_id, patch).await.unwrap_err();
        assert!(matches!(err, RoleStoreError::Validation(_)));
        assert_eq!(store.get(role.role_id).await.unwrap(), role);
    }

    #[tokio::test]
    async fn update_unknown_role_is_not_found() {
        let store = InMemoryRoleStore::new();
        let err = store.update(RoleId::new(), RolePatch::rename("X")).await.unwrap_err();
        assert!(matches!(err, RoleStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_while_referenced_conflicts() {
        let store = InMemoryRoleStore::new();
        let role = store.create(payroll_officer()).await.unwrap();
        let identity = IdentityId::new();
        store.assign_role(identity, role.role_id).await.unwrap();

        let err = store.delete(role.role_id).await.unwrap_err();
        assert!(matches!(err, RoleStoreError::Conflict(_)));
        assert_eq!(store.get(role.role_id).await.unwrap(), role);

        store.unassign(identity).await.unwrap();
        store.delete(role.role_id).await.unwrap();
        assert!(matches!(
            store.get(role.role_id).await,
            Err(RoleStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn assignment_replaces_previous_role() {
        let store = InMemoryRoleStore::new();
        let a = store.create(NewRole::new("A", Portal::Admin, [])).await.unwrap();
        let b = store.create(NewRole::new("B", Portal::Employee, [])).await.unwrap();
        let identity = IdentityId::new();

        store.assign_role(identity, a.role_id).await.unwrap();
        store.assign_role(identity, b.role_id).await.unwrap();

        assert_eq!(store.role_of(identity).await.unwrap(), Some(b.role_id));
        assert_eq!(store.reference_count(a.role_id).await.unwrap(), 0);
        assert_eq!(store.reference_count(b.role_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn identities_with_permission_uses_exact_match_and_wildcard() {
        let store = InMemoryRoleStore::new();
        let admin = store.create(NewRole::new("Root", Portal::Admin, [p("*")])).await.unwrap();
        let approver = store
            .create(NewRole::new("Leave Approver", Portal::Admin, [p("leave.view"), p("leave.manage")]))
            .await
            .unwrap();
        let viewer = store.create(NewRole::new("Leave Viewer", Portal::Admin, [p("leave.view")])).await.unwrap();
        store.create(NewRole::new("Unused", Portal::Admin, [p("leave.manage")])).await.unwrap();

        let (a, b, c) = (IdentityId::new(), IdentityId::new(), IdentityId::new());
        store.assign_role(a, admin.role_id).await.unwrap();
        store.assign_role(b, approver.role_id).await.unwrap();
        store.assign_role(c, viewer.role_id).await.unwrap();

        let mut expected = vec![a, b];
        expected.sort_unstable();
        assert_eq!(store.identities_with_permission("leave.manage").await.unwrap(), expected);

        assert_eq!(store.identities_with_permission("payroll.manage").await.unwrap(), vec![a]);
        // `leave.manage` does not imply `leave.view`, but every holder here lists it.
        assert_eq!(store.identities_with_permission("leave.view").await.unwrap().len(), 3);

        store.unassign(a).await.unwrap();
        assert_eq!(store.identities_with_permission("leave.manage").await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn assigning_unknown_role_is_not_found() {
        let store = InMemoryRoleStore::new();
        let err = store.assign_role(IdentityId::new(), RoleId::new()).await.unwrap_err();
        assert!(matches!(err, RoleStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = InMemoryRoleStore::new();
        let first = seeded_employee(&store).await;
        let again = store
            .seed_system_role(NewRole::new("Employee", Portal::Admin, [p("*")]))
            .await
            .unwrap();
        assert_eq!(again, SeedOutcome::Existing(first));
    }

    #[tokio::test]
    async fn list_is_ordered_by_name() {
        let store = InMemoryRoleStore::new();
        for name in ["Recruiter", "Auditor", "Payroll Officer"] {
            store.create(NewRole::new(name, Portal::Admin, [])).await.unwrap();
        }
        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Auditor", "Payroll Officer", "Recruiter"]);
    }
}
