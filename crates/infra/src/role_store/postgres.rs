//! Postgres-backed role store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RoleStoreError | Scenario |
//! |------------|----------------------|----------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate role name (`roles_name_key`) |
//! | Database (foreign key violation) | `23503` | `Conflict` / `NotFound` | Delete of a referenced role / assignment to a missing role |
//! | Database (check constraint violation) | `23514` | `Validation` | Portal outside `Admin`/`Employee` |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | Other | N/A | `Storage` | Network errors, pool closed, etc. |
//!
//! ## Atomicity
//!
//! Uniqueness is the `roles_name_key` unique index; there is no
//! read-then-insert check. Updates and deletes lock the target row
//! (`SELECT ... FOR UPDATE`) inside a transaction, and the
//! `identity_roles.role_id` foreign key (`ON DELETE RESTRICT`) makes a delete
//! of a referenced role fail even if a reference lands concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use peoplehub_auth::{NewRole, Permission, PermissionCatalog, PermissionSet, Portal, Role, RolePatch};
use peoplehub_core::{IdentityId, RoleId};

use super::{RoleAssignments, RoleStore, RoleStoreError, SeedOutcome};

const SCHEMA: &str = include_str!("../../migrations/0001_roles.sql");

const SELECT_ROLE: &str = r#"
    SELECT role_id, name, description, portal, permissions, is_system, created_at, updated_at
    FROM roles
"#;

#[derive(Debug, Clone)]
pub struct PostgresRoleStore {
    pool: Arc<PgPool>,
    catalog: Arc<PermissionCatalog>,
}

impl PostgresRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            catalog: Arc::new(PermissionCatalog::standard().clone()),
        }
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> Result<(), RoleStoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn insert(&self, role: &Role) -> Result<(), RoleStoreError> {
        sqlx::query(
            r#"
            INSERT INTO roles
                (role_id, name, description, portal, permissions, is_system, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(role.role_id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.portal.as_str())
        .bind(Json(atoms(&role.permissions)))
        .bind(role.is_system)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_role", e))?;
        Ok(())
    }
}

#[async_trait]
impl RoleStore for PostgresRoleStore {
    #[instrument(skip(self, new_role), fields(name = %new_role.name), err)]
    async fn create(&self, new_role: NewRole) -> Result<Role, RoleStoreError> {
        let role = new_role.validate(&self.catalog, RoleId::new(), false, Utc::now())?;
        self.insert(&role).await?;
        tracing::debug!(role_id = %role.role_id, "role created");
        Ok(role)
    }

    #[instrument(skip(self, patch), fields(role_id = %role_id), err)]
    async fn update(&self, role_id: RoleId, patch: RolePatch) -> Result<Role, RoleStoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))?;

        let current = lock_role(&mut tx, role_id).await?;
        let updated = current.patched(&patch, &self.catalog, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, description = $3, portal = $4, permissions = $5, updated_at = $6
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(&updated.name)
        .bind(&updated.description)
        .bind(updated.portal.as_str())
        .bind(Json(atoms(&updated.permissions)))
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_role", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        tracing::debug!(name = %updated.name, "role updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(role_id = %role_id), err)]
    async fn delete(&self, role_id: RoleId) -> Result<(), RoleStoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))?;

        let role = lock_role(&mut tx, role_id).await?;
        if role.is_system {
            return Err(RoleStoreError::Forbidden(format!(
                "system role '{}' cannot be deleted",
                role.name
            )));
        }

        sqlx::query("DELETE FROM roles WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| match map_sqlx_error("delete_role", e) {
                RoleStoreError::Conflict(_) => RoleStoreError::Conflict(format!(
                    "role '{}' is still assigned to one or more identities",
                    role.name
                )),
                other => other,
            })?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        tracing::debug!(name = %role.name, "role deleted");
        Ok(())
    }

    async fn get(&self, role_id: RoleId) -> Result<Role, RoleStoreError> {
        let row = sqlx::query(&format!("{SELECT_ROLE} WHERE role_id = $1"))
            .bind(role_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_role", e))?
            .ok_or_else(|| RoleStoreError::role_not_found(role_id))?;
        decode_role(&row)
    }

    async fn list(&self) -> Result<Vec<Role>, RoleStoreError> {
        let rows = sqlx::query(&format!("{SELECT_ROLE} ORDER BY name"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;
        rows.iter().map(decode_role).collect()
    }

    #[instrument(skip(self, new_role), fields(name = %new_role.name), err)]
    async fn seed_system_role(&self, new_role: NewRole) -> Result<SeedOutcome, RoleStoreError> {
        let role = new_role.validate(&self.catalog, RoleId::new(), true, Utc::now())?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO roles
                (role_id, name, description, portal, permissions, is_system, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(role.role_id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.portal.as_str())
        .bind(Json(atoms(&role.permissions)))
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("seed_role", e))?
        .rows_affected();

        if inserted == 1 {
            return Ok(SeedOutcome::Created(role));
        }

        let row = sqlx::query(&format!("{SELECT_ROLE} WHERE name = $1"))
            .bind(&role.name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("seed_role_lookup", e))?;
        Ok(SeedOutcome::Existing(decode_role(&row)?))
    }
}

#[async_trait]
impl RoleAssignments for PostgresRoleStore {
    async fn assign_role(&self, identity_id: IdentityId, role_id: RoleId) -> Result<(), RoleStoreError> {
        sqlx::query(
            r#"
            INSERT INTO identity_roles (identity_id, role_id, assigned_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (identity_id) DO UPDATE SET role_id = EXCLUDED.role_id, assigned_at = EXCLUDED.assigned_at
            "#,
        )
        .bind(identity_id.as_uuid())
        .bind(role_id.as_uuid())
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(|e| match map_sqlx_error("assign_role", e) {
            // The only foreign key on this table points at roles.
            RoleStoreError::Conflict(_) => RoleStoreError::role_not_found(role_id),
            other => other,
        })?;
        Ok(())
    }

    async fn unassign(&self, identity_id: IdentityId) -> Result<(), RoleStoreError> {
        sqlx::query("DELETE FROM identity_roles WHERE identity_id = $1")
            .bind(identity_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("unassign", e))?;
        Ok(())
    }

    async fn role_of(&self, identity_id: IdentityId) -> Result<Option<RoleId>, RoleStoreError> {
        let row = sqlx::query("SELECT role_id FROM identity_roles WHERE identity_id = $1")
            .bind(identity_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("role_of", e))?;

        row.map(|r| {
            r.try_get::<uuid::Uuid, _>("role_id")
                .map(RoleId::from_uuid)
                .map_err(|e| map_sqlx_error("role_of_decode", e))
        })
        .transpose()
    }

    async fn reference_count(&self, role_id: RoleId) -> Result<u64, RoleStoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM identity_roles WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("reference_count", e))?;
        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self), err)]
    async fn identities_with_permission(&self, atom: &str) -> Result<Vec<IdentityId>, RoleStoreError> {
        // `?` on a JSONB array tests for a string element, i.e. an exact atom.
        let ids: Vec<uuid::Uuid> = sqlx::query_scalar(
            r#"
            SELECT ir.identity_id
            FROM identity_roles ir
            JOIN roles r ON r.role_id = ir.role_id
            WHERE r.permissions ? $1 OR r.permissions ? '*'
            ORDER BY ir.identity_id
            "#,
        )
        .bind(atom)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("identities_with_permission", e))?;

        Ok(ids.into_iter().map(IdentityId::from_uuid).collect())
    }
}

async fn lock_role(tx: &mut Transaction<'_, Postgres>, role_id: RoleId) -> Result<Role, RoleStoreError> {
    let row = sqlx::query(&format!("{SELECT_ROLE} WHERE role_id = $1 FOR UPDATE"))
        .bind(role_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_role", e))?
        .ok_or_else(|| RoleStoreError::role_not_found(role_id))?;
    decode_role(&row)
}

fn atoms(set: &PermissionSet) -> Vec<&str> {
    set.iter().map(Permission::as_str).collect()
}

fn decode_role(row: &sqlx::postgres::PgRow) -> Result<Role, RoleStoreError> {
    let decode = |e| map_sqlx_error("decode_role", e);

    let portal: String = row.try_get("portal").map_err(decode)?;
    // The CHECK constraint keeps this unreachable; an unknown value still
    // surfaces as a storage error rather than a defaulted portal.
    let portal: Portal = portal
        .parse()
        .map_err(|_| RoleStoreError::Storage(format!("unrecognized portal '{portal}' in roles table")))?;

    let Json(permissions): Json<Vec<String>> = row.try_get("permissions").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode)?;

    Ok(Role {
        role_id: RoleId::from_uuid(row.try_get("role_id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        portal,
        permissions: PermissionSet::normalize(permissions.into_iter().map(Permission::from)),
        is_system: row.try_get("is_system").map_err(decode)?,
        created_at,
        updated_at,
    })
}

/// Map SQLx errors to RoleStoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RoleStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RoleStoreError::Conflict(match db_err.constraint() {
                    Some("roles_name_key") => "a role with this name already exists".to_string(),
                    _ => msg,
                }),
                Some("23503") => RoleStoreError::Conflict(msg),
                Some("23514") => RoleStoreError::Validation(msg),
                _ => RoleStoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RoleStoreError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => RoleStoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Requires a reachable database: `DATABASE_URL=postgres://... cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn unique_index_rejects_duplicate_names() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let store = PostgresRoleStore::new(PgPool::connect(&url).await.unwrap());
        store.migrate().await.unwrap();

        let name = format!("Dup {}", RoleId::new());
        store.create(NewRole::new(name.clone(), Portal::Admin, [])).await.unwrap();
        let err = store.create(NewRole::new(name, Portal::Admin, [])).await.unwrap_err();
        assert!(matches!(err, RoleStoreError::Conflict(_)));
    }

    #[tokio::test]
    #[ignore]
    async fn referenced_role_cannot_be_deleted() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let store = PostgresRoleStore::new(PgPool::connect(&url).await.unwrap());
        store.migrate().await.unwrap();

        let role = store
            .create(NewRole::new(format!("Ref {}", RoleId::new()), Portal::Employee, []))
            .await
            .unwrap();
        let identity = IdentityId::new();
        store.assign_role(identity, role.role_id).await.unwrap();

        let err = store.delete(role.role_id).await.unwrap_err();
        assert!(matches!(err, RoleStoreError::Conflict(_)));
        assert_eq!(store.get(role.role_id).await.unwrap().name, role.name);

        store.unassign(identity).await.unwrap();
        store.delete(role.role_id).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn identities_with_permission_matches_atoms_exactly() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let store = PostgresRoleStore::new(PgPool::connect(&url).await.unwrap());
        store.migrate().await.unwrap();

        let approver = store
            .create(NewRole::new(
                format!("Approver {}", RoleId::new()),
                Portal::Admin,
                [Permission::from_static("leave.manage")],
            ))
            .await
            .unwrap();
        let viewer = store
            .create(NewRole::new(
                format!("Viewer {}", RoleId::new()),
                Portal::Admin,
                [Permission::from_static("leave.view")],
            ))
            .await
            .unwrap();
        let (a, b) = (IdentityId::new(), IdentityId::new());
        store.assign_role(a, approver.role_id).await.unwrap();
        store.assign_role(b, viewer.role_id).await.unwrap();

        let found = store.identities_with_permission("leave.manage").await.unwrap();
        assert!(found.contains(&a));
        assert!(!found.contains(&b));

        store.unassign(a).await.unwrap();
        store.unassign(b).await.unwrap();
    }
}
