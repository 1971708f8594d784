//! Roles: named, persisted bundles of a portal and a permission set.
//!
//! Everything here is pure. Stores call [`NewRole::validate`] and
//! [`Role::patched`] to get a fully checked record, then enforce name
//! uniqueness and reference counts atomically on their side.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use peoplehub_core::{DomainError, DomainResult, Entity, RoleId};

use crate::catalog::PermissionCatalog;
use crate::permissions::{self, Permission};

/// Longest accepted role name, in characters.
pub const MAX_NAME_LEN: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Portal
// ─────────────────────────────────────────────────────────────────────────────

/// One of the two isolated application surfaces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Portal {
    Admin,
    Employee,
}

impl Portal {
    pub const ALL: [Portal; 2] = [Portal::Admin, Portal::Employee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Portal::Admin => "Admin",
            Portal::Employee => "Employee",
        }
    }

    /// The catalog atom that conventionally accompanies membership of this
    /// portal. Membership itself is decided by [`Role::portal`].
    pub fn access_permission(&self) -> Permission {
        match self {
            Portal::Admin => permissions::portal::ADMIN,
            Portal::Employee => permissions::portal::EMPLOYEE,
        }
    }
}

impl core::fmt::Display for Portal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Portal {
    type Err = DomainError;

    /// Exact match on `"Admin"` / `"Employee"`. Anything else is rejected
    /// rather than defaulted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Portal::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(format!("portal must be one of: Admin, Employee (got '{s}')"))
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Permission set
// ─────────────────────────────────────────────────────────────────────────────

/// A role's atoms, deduplicated and ordered.
///
/// # Invariant
/// If the wildcard is present it is the only element. Every constructor
/// upholds this, so code holding a `PermissionSet` never sees `{"*", ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn wildcard() -> Self {
        Self(BTreeSet::from([Permission::wildcard()]))
    }

    /// Build a set from arbitrary input.
    ///
    /// Duplicates are dropped. If the wildcard appears anywhere in the input
    /// the result is exactly `{"*"}`, whatever else was passed.
    pub fn normalize(atoms: impl IntoIterator<Item = Permission>) -> Self {
        let set: BTreeSet<Permission> = atoms.into_iter().collect();
        if set.iter().any(Permission::is_wildcard) {
            Self::wildcard()
        } else {
            Self(set)
        }
    }

    pub fn has_wildcard(&self) -> bool {
        self.0.iter().any(Permission::is_wildcard)
    }

    pub fn contains(&self, atom: &str) -> bool {
        self.0.contains(atom)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checkbox transition used by role editors.
    ///
    /// - checking `"*"` yields `{"*"}`;
    /// - checking any other atom removes `"*"` and adds the atom;
    /// - unchecking removes just that atom.
    pub fn apply_toggle(&self, atom: &Permission, checked: bool) -> Self {
        if !checked {
            let mut next = self.0.clone();
            next.remove(atom);
            return Self(next);
        }

        if atom.is_wildcard() {
            return Self::wildcard();
        }

        let mut next: BTreeSet<Permission> =
            self.0.iter().filter(|p| !p.is_wildcard()).cloned().collect();
        next.insert(atom.clone());
        Self(next)
    }

    /// Reject atoms the catalog does not know.
    pub fn validate(&self, catalog: &PermissionCatalog) -> DomainResult<()> {
        let unknown: Vec<&str> = self
            .0
            .iter()
            .map(Permission::as_str)
            .filter(|a| !catalog.is_valid(a))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation(format!(
                "unknown permission(s): {}",
                unknown.join(", ")
            )))
        }
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let atoms = Vec::<Permission>::deserialize(deserializer)?;
        Ok(Self::normalize(atoms))
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self::normalize(iter)
    }
}

/// Free-function form of [`PermissionSet::apply_toggle`].
pub fn apply_toggle(permissions: &PermissionSet, atom: &Permission, checked: bool) -> PermissionSet {
    permissions.apply_toggle(atom, checked)
}

// ─────────────────────────────────────────────────────────────────────────────
// Role
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub role_id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub portal: Portal,
    pub permissions: PermissionSet,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.role_id
    }
}

impl Role {
    /// Exact-match grant check: the wildcard or the atom itself.
    pub fn grants(&self, atom: &str) -> bool {
        self.permissions.has_wildcard() || self.permissions.contains(atom)
    }

    /// Apply a client patch, returning the updated record.
    ///
    /// # Errors
    /// - `Forbidden` when the patch would rename a system role or change the
    ///   `is_system` flag of any role.
    /// - `Validation` under the same rules as [`NewRole::validate`].
    pub fn patched(
        &self,
        patch: &RolePatch,
        catalog: &PermissionCatalog,
        now: DateTime<Utc>,
    ) -> DomainResult<Role> {
        if let Some(flag) = patch.is_system {
            if flag != self.is_system {
                return Err(DomainError::forbidden("is_system cannot be changed by clients"));
            }
        }

        let name = match &patch.name {
            Some(raw) => {
                // System names are fixed, so any other value is a rename
                // attempt even when it would also fail validation.
                if self.is_system && raw.trim() != self.name {
                    return Err(DomainError::forbidden(format!(
                        "system role '{}' cannot be renamed",
                        self.name
                    )));
                }
                normalize_name(raw)?
            }
            None => self.name.clone(),
        };

        let permissions = match &patch.permissions {
            Some(atoms) => {
                let set = PermissionSet::normalize(atoms.iter().cloned());
                set.validate(catalog)?;
                set
            }
            None => self.permissions.clone(),
        };

        let description = match &patch.description {
            Some(d) => normalize_description(d.as_deref()),
            None => self.description.clone(),
        };

        Ok(Role {
            role_id: self.role_id,
            name,
            description,
            portal: patch.portal.unwrap_or(self.portal),
            permissions,
            is_system: self.is_system,
            created_at: self.created_at,
            updated_at: now,
        })
    }
}

/// Input for creating a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
    pub portal: Portal,
    pub permissions: Vec<Permission>,
}

impl NewRole {
    pub fn new(
        name: impl Into<String>,
        portal: Portal,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            portal,
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check and normalize the input into a persistable role.
    ///
    /// Name uniqueness is not checked here; it belongs to the store's write.
    pub fn validate(
        &self,
        catalog: &PermissionCatalog,
        role_id: RoleId,
        is_system: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<Role> {
        let name = normalize_name(&self.name)?;
        let permissions = PermissionSet::normalize(self.permissions.iter().cloned());
        permissions.validate(catalog)?;

        Ok(Role {
            role_id,
            name,
            description: normalize_description(self.description.as_deref()),
            portal: self.portal,
            permissions,
            is_system,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update. `None` leaves a field untouched; for `description`,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub portal: Option<Portal>,
    pub permissions: Option<Vec<Permission>>,
    pub is_system: Option<bool>,
}

impl RolePatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn permissions(atoms: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            permissions: Some(atoms.into_iter().collect()),
            ..Self::default()
        }
    }
}

fn normalize_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("role name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "role name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn normalize_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &'static str) -> Permission {
        Permission::from_static(s)
    }

    fn catalog() -> &'static PermissionCatalog {
        PermissionCatalog::standard()
    }

    fn system_employee() -> Role {
        NewRole::new(
            "Employee",
            Portal::Employee,
            [p("portal.employee"), p("leave.self"), p("attendance.self"), p("payroll.self")],
        )
        .validate(catalog(), RoleId::new(), true, Utc::now())
        .unwrap()
    }

    #[test]
    fn portal_parses_exact_names_only() {
        assert_eq!("Admin".parse::<Portal>().unwrap(), Portal::Admin);
        assert_eq!("Employee".parse::<Portal>().unwrap(), Portal::Employee);
        assert!(matches!("admin".parse::<Portal>(), Err(DomainError::Validation(_))));
        assert!("Manager".parse::<Portal>().is_err());
    }

    #[test]
    fn portal_access_permissions_are_catalog_atoms() {
        for portal in Portal::ALL {
            assert!(catalog().is_valid(portal.access_permission().as_str()));
        }
        assert_eq!(Portal::Admin.access_permission().as_str(), "portal.admin");
    }

    #[test]
    fn normalize_collapses_wildcard() {
        let set = PermissionSet::normalize([p("payroll.view"), p("*"), p("leave.view")]);
        assert_eq!(set, PermissionSet::wildcard());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn normalize_dedupes() {
        let set = PermissionSet::normalize([p("leave.view"), p("leave.view")]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn toggling_wildcard_on_clears_everything_else() {
        let set = PermissionSet::normalize([p("payroll.view"), p("claims.view")]);
        let next = set.apply_toggle(&Permission::wildcard(), true);
        assert_eq!(next, PermissionSet::wildcard());
    }

    #[test]
    fn toggling_atom_on_clears_wildcard() {
        let next = apply_toggle(&PermissionSet::wildcard(), &p("leave.manage"), true);
        assert_eq!(next, PermissionSet::normalize([p("leave.manage")]));
        assert!(!next.has_wildcard());
    }

    #[test]
    fn toggling_off_removes_only_that_atom() {
        let set = PermissionSet::normalize([p("leave.view"), p("leave.manage")]);
        let next = set.apply_toggle(&p("leave.view"), false);
        assert_eq!(next, PermissionSet::normalize([p("leave.manage")]));

        let cleared = PermissionSet::wildcard().apply_toggle(&Permission::wildcard(), false);
        assert!(cleared.is_empty());
    }

    #[test]
    fn deserializing_a_set_normalizes_it() {
        let set: PermissionSet = serde_json::from_str(r#"["*","leave.view"]"#).unwrap();
        assert_eq!(set, PermissionSet::wildcard());
    }

    #[test]
    fn validate_rejects_unknown_atoms() {
        let err = NewRole::new("Auditor", Portal::Admin, [p("payroll.view"), p("payroll.audit")])
            .validate(catalog(), RoleId::new(), false, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("payroll.audit")));
    }

    #[test]
    fn validate_rejects_blank_and_long_names() {
        let blank = NewRole::new("   ", Portal::Admin, []);
        assert!(matches!(
            blank.validate(catalog(), RoleId::new(), false, Utc::now()),
            Err(DomainError::Validation(_))
        ));

        let long = NewRole::new("x".repeat(MAX_NAME_LEN + 1), Portal::Admin, []);
        assert!(long.validate(catalog(), RoleId::new(), false, Utc::now()).is_err());
    }

    #[test]
    fn validate_trims_name_and_drops_blank_description() {
        let role = NewRole::new("  Payroll Officer ", Portal::Admin, [p("payroll.view")])
            .with_description("   ")
            .validate(catalog(), RoleId::new(), false, Utc::now())
            .unwrap();
        assert_eq!(role.name, "Payroll Officer");
        assert_eq!(role.description, None);
        assert!(!role.is_system);
    }

    #[test]
    fn system_role_cannot_be_renamed() {
        let role = system_employee();
        let err = role.patched(&RolePatch::rename("X"), catalog(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn renaming_a_system_role_to_an_invalid_name_is_still_forbidden() {
        let role = system_employee();
        for name in [String::new(), "   ".to_string(), "x".repeat(MAX_NAME_LEN + 1)] {
            let err = role.patched(&RolePatch::rename(name), catalog(), Utc::now()).unwrap_err();
            assert!(matches!(err, DomainError::Forbidden(_)), "{err:?}");
        }

        let padded = role.patched(&RolePatch::rename("  Employee "), catalog(), Utc::now()).unwrap();
        assert_eq!(padded.name, "Employee");
    }

    #[test]
    fn role_grants_exact_atoms_and_wildcard() {
        let role = system_employee();
        assert!(role.grants("leave.self"));
        assert!(!role.grants("leave.manage"));

        let admin = NewRole::new("Root", Portal::Admin, [Permission::wildcard()])
            .validate(catalog(), RoleId::new(), false, Utc::now())
            .unwrap();
        assert!(admin.grants("leave.manage"));
    }

    #[test]
    fn system_role_patch_with_same_name_is_allowed() {
        let role = system_employee();
        let patch = RolePatch {
            name: Some("Employee".into()),
            permissions: Some(vec![p("portal.employee"), p("leave.self")]),
            ..RolePatch::default()
        };
        let updated = role.patched(&patch, catalog(), Utc::now()).unwrap();
        assert_eq!(updated.name, "Employee");
        assert_eq!(updated.permissions.len(), 2);
        assert!(updated.is_system);
    }

    #[test]
    fn is_system_flag_is_not_client_settable() {
        let role = NewRole::new("Temp", Portal::Employee, [])
            .validate(catalog(), RoleId::new(), false, Utc::now())
            .unwrap();
        let patch = RolePatch {
            is_system: Some(true),
            ..RolePatch::default()
        };
        assert!(matches!(
            role.patched(&patch, catalog(), Utc::now()),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn patch_keeps_identity_and_clears_description() {
        let role = NewRole::new("Temp", Portal::Employee, [])
            .with_description("short-lived")
            .validate(catalog(), RoleId::new(), false, Utc::now())
            .unwrap();
        let patch = RolePatch {
            description: Some(None),
            portal: Some(Portal::Admin),
            ..RolePatch::default()
        };
        let updated = role.patched(&patch, catalog(), Utc::now()).unwrap();
        assert_eq!(updated.role_id, role.role_id);
        assert_eq!(updated.created_at, role.created_at);
        assert_eq!(updated.description, None);
        assert_eq!(updated.portal, Portal::Admin);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn atom() -> impl Strategy<Value = Permission> {
            let atoms: Vec<Permission> = PermissionCatalog::standard()
                .list_groups()
                .iter()
                .flat_map(|g| g.atoms.iter().cloned())
                .collect();
            proptest::sample::select(atoms)
        }

        proptest! {
            /// Property: no reachable set ever mixes the wildcard with other atoms.
            #[test]
            fn toggles_preserve_wildcard_exclusivity(
                start in proptest::collection::vec(atom(), 0..8),
                steps in proptest::collection::vec((atom(), any::<bool>()), 0..32)
            ) {
                let mut set = PermissionSet::normalize(start);
                for (atom, checked) in steps {
                    set = set.apply_toggle(&atom, checked);
                    prop_assert!(!set.has_wildcard() || set.len() == 1);
                    if checked {
                        prop_assert!(set.contains(atom.as_str()));
                    } else {
                        prop_assert!(!set.contains(atom.as_str()));
                    }
                }
            }
        }
    }
}
