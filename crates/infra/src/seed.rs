//! System roles seeded at startup.
//!
//! These are created with `is_system = true`: their names are fixed and they
//! cannot be deleted. Their permission sets remain editable afterwards, and
//! re-seeding never overwrites such edits.

use peoplehub_auth::permissions::dashboard;
use peoplehub_auth::{NewRole, Permission, Portal, Role};

use crate::role_store::{RoleStore, RoleStoreError, SeedOutcome};

const EMPLOYEE_SELF_SERVICE: &[&str] = &[
    "employees.self_view",
    "onboarding.self",
    "assets.self",
    "policies.self",
    "leave.self",
    "attendance.self",
    "timesheet.self",
    "overtime.self",
    "payroll.self",
    "claims.self",
];

const HR_ADMINISTRATION: &[&str] = &[
    "employees.view",
    "employees.manage",
    "employees.view_salary",
    "employees.view_bank",
    "org_chart.view",
    "onboarding.view",
    "onboarding.manage",
    "assets.view",
    "assets.manage",
    "policies.view",
    "policies.manage",
    "leave.view",
    "leave.manage",
    "attendance.view",
    "attendance.manage",
    "timesheet.view",
    "timesheet.manage",
    "overtime.view",
    "overtime.manage",
    "payroll.view",
    "payroll.manage",
    "claims.view",
    "claims.manage",
    "performance.view",
    "performance.manage",
    "recruitment.view",
    "recruitment.manage",
    "settings.view",
    "settings.manage",
    "offer_letters.view",
    "offer_letters.manage",
    "roles.manage",
];

fn atoms(list: &[&'static str]) -> Vec<Permission> {
    list.iter().map(|a| Permission::from_static(a)).collect()
}

/// Portal access and the dashboard, followed by `list`.
fn surface(portal: Portal, list: &[&'static str]) -> Vec<Permission> {
    let mut out = vec![portal.access_permission(), dashboard::VIEW];
    out.extend(atoms(list));
    out
}

/// The built-in role definitions, in seeding order.
pub fn system_role_definitions() -> Vec<NewRole> {
    let mut manager = surface(Portal::Employee, EMPLOYEE_SELF_SERVICE);
    manager.extend(atoms(&["performance.view", "performance.manage"]));

    vec![
        NewRole::new("Admin", Portal::Admin, [Permission::wildcard()])
            .with_description("Full access to every capability"),
        NewRole::new("HR", Portal::Admin, surface(Portal::Admin, HR_ADMINISTRATION))
            .with_description("HR administration across all modules"),
        NewRole::new("Employee", Portal::Employee, surface(Portal::Employee, EMPLOYEE_SELF_SERVICE))
            .with_description("Self-service access to one's own records"),
        NewRole::new("Manager", Portal::Employee, manager)
            .with_description("Employee self-service plus team performance management"),
    ]
}

/// Seed every system role. Idempotent: roles that already exist by name are
/// returned as they are.
pub async fn seed_system_roles<S>(store: &S) -> Result<Vec<Role>, RoleStoreError>
where
    S: RoleStore + ?Sized,
{
    let mut seeded = Vec::new();
    for definition in system_role_definitions() {
        match store.seed_system_role(definition).await? {
            SeedOutcome::Created(role) => {
                tracing::info!(role_id = %role.role_id, name = %role.name, "seeded system role");
                seeded.push(role);
            }
            SeedOutcome::Existing(role) => {
                if !role.is_system {
                    tracing::warn!(name = %role.name, "system role name is held by a non-system role");
                }
                seeded.push(role);
            }
        }
    }
    Ok(seeded)
}
