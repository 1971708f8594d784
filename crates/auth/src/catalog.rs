//! Permission catalog: the registry of valid atoms and their display groups.
//!
//! The catalog is read-only at runtime. Changing it means shipping a new
//! build with a bumped [`CATALOG_VERSION`].

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::Serialize;

use crate::permissions::{Permission, WILDCARD};

/// Version of the built-in catalog.
pub const CATALOG_VERSION: &str = "2024.1";

/// A labelled, ordered list of atoms. Groups exist for presentation only and
/// carry no evaluation semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionGroup {
    pub label: String,
    pub atoms: Vec<Permission>,
}

impl PermissionGroup {
    pub fn new(label: impl Into<String>, atoms: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            label: label.into(),
            atoms: atoms.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionCatalog {
    version: String,
    groups: Vec<PermissionGroup>,
    #[serde(skip)]
    index: HashSet<Permission>,
}

impl PermissionCatalog {
    pub fn new(version: impl Into<String>, groups: Vec<PermissionGroup>) -> Self {
        let index = groups
            .iter()
            .flat_map(|g| g.atoms.iter().cloned())
            .collect();
        Self {
            version: version.into(),
            groups,
            index,
        }
    }

    /// The catalog compiled into this build.
    pub fn standard() -> &'static PermissionCatalog {
        &STANDARD
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Groups in display order. Calling this again yields the same sequence.
    pub fn list_groups(&self) -> &[PermissionGroup] {
        &self.groups
    }

    /// `true` for the wildcard and for any atom listed in some group.
    pub fn is_valid(&self, atom: &str) -> bool {
        atom == WILDCARD || self.index.contains(atom)
    }

    /// Every concrete atom, in group order, without the wildcard.
    pub fn atoms(&self) -> impl Iterator<Item = &Permission> {
        self.groups
            .iter()
            .flat_map(|g| g.atoms.iter())
            .filter(|p| !p.is_wildcard())
    }

    /// Label of the first group listing `atom`.
    pub fn group_of(&self, atom: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.atoms.iter().any(|p| p.as_str() == atom))
            .map(|g| g.label.as_str())
    }
}

static STANDARD: LazyLock<PermissionCatalog> = LazyLock::new(|| {
    fn group(label: &str, atoms: &[&'static str]) -> PermissionGroup {
        PermissionGroup::new(label, atoms.iter().map(|a| Permission::from_static(a)))
    }

    PermissionCatalog::new(
        CATALOG_VERSION,
        vec![
            group("Full Access", &[WILDCARD]),
            group("Portal Access", &["portal.admin", "portal.employee"]),
            group("Dashboard", &["dashboard.view"]),
            group(
                "Employees",
                &[
                    "employees.view",
                    "employees.manage",
                    "employees.view_salary",
                    "employees.view_bank",
                    "employees.self_view",
                ],
            ),
            group("Organization", &["org_chart.view"]),
            group("Onboarding", &["onboarding.view", "onboarding.manage", "onboarding.self"]),
            group("Assets", &["assets.view", "assets.manage", "assets.self"]),
            group("Policies", &["policies.view", "policies.manage", "policies.self"]),
            group("Leave", &["leave.view", "leave.manage", "leave.self"]),
            group("Attendance", &["attendance.view", "attendance.manage", "attendance.self"]),
            group(
                "Timesheets & Overtime",
                &[
                    "timesheet.view",
                    "timesheet.manage",
                    "timesheet.self",
                    "overtime.view",
                    "overtime.manage",
                    "overtime.self",
                ],
            ),
            group(
                "Payroll",
                &[
                    "payroll.view",
                    "payroll.manage",
                    "payroll.self",
                    "claims.view",
                    "claims.manage",
                    "claims.self",
                ],
            ),
            group("Performance", &["performance.view", "performance.manage"]),
            group("Recruitment", &["recruitment.view", "recruitment.manage"]),
            group("Settings", &["settings.view", "settings.manage"]),
            group("Offer Letters", &["offer_letters.view", "offer_letters.manage"]),
            group("Roles", &["roles.manage"]),
        ],
    )
});
