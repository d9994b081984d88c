//! Postgres-backed workspace store.
//!
//! Expected tables (migrations are managed outside this crate):
//!
//! | Table | Columns |
//! |-------|---------|
//! | `tenants` | `id uuid pk`, `name`, `subdomain UNIQUE`, `status`, `subscription_plan`, `max_users int`, `max_projects int`, `created_at`, `updated_at` |
//! | `users` | `id uuid pk`, `tenant_id uuid NULL → tenants`, `email`, `password_hash`, `full_name`, `role`, `is_active bool`, `created_at`, `updated_at`, `UNIQUE NULLS NOT DISTINCT (tenant_id, email)` |
//! | `projects` | `id uuid pk`, `tenant_id → tenants`, `name`, `description NULL`, `status`, `created_by → users`, `created_at`, `updated_at` |
//! | `tasks` | `id uuid pk`, `project_id → projects ON DELETE CASCADE`, `tenant_id → tenants`, `title`, `description NULL`, `status`, `priority`, `assigned_to uuid NULL → users`, `due_date date NULL`, `created_at`, `updated_at` |
//! | `audit_logs` | `id uuid pk`, `tenant_id NULL`, `user_id`, `action`, `entity_type`, `entity_id uuid`, `created_at` |
//!
//! ## Error Mapping
//!
//! | PostgreSQL code | StoreError |
//! |-----------------|------------|
//! | `23505` unique violation | `Conflict` |
//! | `23503` foreign key violation | `NotFound` |
//! | anything else | `Backend` |
//!
//! ## Quota-guarded inserts
//!
//! `insert_countable` runs in one transaction that first locks the owning
//! tenant row with `SELECT ... FOR UPDATE`. Competing creations for the same
//! tenant queue on that lock; the `COUNT(*)` that follows runs with a fresh
//! READ COMMITTED snapshot, so it sees every insert committed ahead of it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use workhive_auth::{Role, TenantScope};
use workhive_core::{AuditEntryId, ProjectId, TaskId, TenantId, UserId};
use workhive_tenancy::{
    AuditAction, AuditFilter, AuditLogEntry, EntityType, Page, Paged, Project, ProjectFilter,
    ProjectStatus, ProjectSummary, ResourceKind, SubscriptionPlan, Task, TaskFilter, TaskPriority,
    TaskStatus, Tenant, TenantFilter, TenantStats, TenantStatus, TenantSummary, UserAccount,
    UserFilter,
};

use super::{CountableRow, StoreError, WorkspaceStore};
use crate::quota::{self, QuotaUsage, Reservation};

#[derive(Debug, Clone)]
pub struct PostgresWorkspaceStore {
    pool: Arc<PgPool>,
}

impl PostgresWorkspaceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect with a small default pool.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

fn scope_param(scope: TenantScope) -> Option<Uuid> {
    match scope {
        TenantScope::All => None,
        TenantScope::Only(t) => Some(*t.as_uuid()),
    }
}

fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

fn read_count(row: &PgRow, column: &str) -> Result<u64, StoreError> {
    let n: i64 = row
        .try_get(column)
        .map_err(|e| StoreError::Backend(format!("failed to read {column}: {e}")))?;
    Ok(n.max(0) as u64)
}

async fn insert_user(tx: &mut Transaction<'_, Postgres>, user: &UserAccount) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO users (id, tenant_id, email, password_hash, full_name, role, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(user.id.as_uuid())
    .bind(user.tenant_id.map(Uuid::from))
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.full_name)
    .bind(user.role.as_str())
    .bind(user.is_active)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_user", e))?;
    Ok(())
}

async fn insert_project(tx: &mut Transaction<'_, Postgres>, project: &Project) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO projects (id, tenant_id, name, description, status, created_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(project.id.as_uuid())
    .bind(project.tenant_id.as_uuid())
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.status.as_str())
    .bind(project.created_by.as_uuid())
    .bind(project.created_at)
    .bind(project.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_project", e))?;
    Ok(())
}

const TENANT_COLUMNS: &str =
    "id, name, subdomain, status, subscription_plan, max_users, max_projects, created_at, updated_at";
const USER_COLUMNS: &str =
    "id, tenant_id, email, password_hash, full_name, role, is_active, created_at, updated_at";
const PROJECT_COLUMNS: &str =
    "id, tenant_id, name, description, status, created_by, created_at, updated_at";
const TASK_COLUMNS: &str = "id, project_id, tenant_id, title, description, status, priority, assigned_to, due_date, created_at, updated_at";

#[async_trait]
impl WorkspaceStore for PostgresWorkspaceStore {
    #[instrument(skip(self, tenant, admin), fields(tenant_id = %tenant.id, subdomain = %tenant.subdomain), err)]
    async fn create_tenant_with_admin(&self, tenant: Tenant, admin: UserAccount) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO tenants (id, name, subdomain, status, subscription_plan, max_users, max_projects, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(&tenant.subdomain)
        .bind(tenant.status.as_str())
        .bind(tenant.subscription_plan.as_str())
        .bind(to_i32(tenant.max_users))
        .bind(to_i32(tenant.max_projects))
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            let err = if is_unique_violation(&e) {
                StoreError::Conflict(format!("subdomain '{}' is already taken", tenant.subdomain))
            } else {
                map_sqlx_error("insert_tenant", e)
            };
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(err);
        }

        if let Err(err) = insert_user(&mut tx, &admin).await {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(err);
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), err)]
    async fn find_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        let row = sqlx::query(&format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_tenant", e))?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError> {
        let row = sqlx::query(&format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE subdomain = $1"))
            .bind(subdomain)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_tenant_by_subdomain", e))?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.id), err)]
    async fn update_tenant(&self, tenant: &Tenant) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tenants
            SET name = $2, status = $3, subscription_plan = $4, max_users = $5, max_projects = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(tenant.status.as_str())
        .bind(tenant.subscription_plan.as_str())
        .bind(to_i32(tenant.max_users))
        .bind(to_i32(tenant.max_projects))
        .bind(tenant.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_tenant", e))?;
        expect_one(result.rows_affected(), "tenant")
    }

    #[instrument(skip(self), err)]
    async fn list_tenants(&self, filter: &TenantFilter, page: Page) -> Result<Paged<TenantSummary>, StoreError> {
        let status = filter.status.map(|s| s.as_str());
        let plan = filter.subscription_plan.map(|p| p.as_str());

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total FROM tenants
            WHERE ($1::text IS NULL OR status = $1)
                AND ($2::text IS NULL OR subscription_plan = $2)
            "#,
        )
        .bind(status)
        .bind(plan)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_tenants", e))?;
        let total = read_count(&count_row, "total")?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {TENANT_COLUMNS},
                (SELECT COUNT(*) FROM users u WHERE u.tenant_id = tenants.id) AS total_users,
                (SELECT COUNT(*) FROM projects p WHERE p.tenant_id = tenants.id) AS total_projects
            FROM tenants
            WHERE ($1::text IS NULL OR status = $1)
                AND ($2::text IS NULL OR subscription_plan = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(status)
        .bind(plan)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_tenants", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(TenantSummary {
                tenant: tenant_from_row(row)?,
                total_users: read_count(row, "total_users")?,
                total_projects: read_count(row, "total_projects")?,
            });
        }
        Ok(Paged { items, total, page: page.page, limit: page.limit })
    }

    #[instrument(skip(self), err)]
    async fn tenant_stats(&self, id: TenantId) -> Result<TenantStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE tenant_id = $1) AS total_users,
                (SELECT COUNT(*) FROM projects WHERE tenant_id = $1) AS total_projects,
                (SELECT COUNT(*) FROM tasks WHERE tenant_id = $1) AS total_tasks
            "#,
        )
        .bind(id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("tenant_stats", e))?;

        Ok(TenantStats {
            total_users: read_count(&row, "total_users")?,
            total_projects: read_count(&row, "total_projects")?,
            total_tasks: read_count(&row, "total_tasks")?,
        })
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_super_admin(&self, user: UserAccount) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        if let Err(err) = insert_user(&mut tx, &user).await {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(err);
        }
        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), err)]
    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, email), err)]
    async fn find_user_by_email(
        &self,
        tenant_id: Option<TenantId>,
        email: &str,
    ) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE tenant_id IS NOT DISTINCT FROM $1 AND email = $2"
        ))
        .bind(tenant_id.map(Uuid::from))
        .bind(email)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_users(
        &self,
        scope: TenantScope,
        filter: &UserFilter,
        page: Page,
    ) -> Result<Paged<UserAccount>, StoreError> {
        let tenant = scope_param(scope);
        let role = filter.role.map(|r| r.as_str());
        let search = filter.search.as_deref();

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total FROM users
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
                AND ($2::text IS NULL OR role = $2)
                AND ($3::text IS NULL OR email ILIKE '%' || $3 || '%' OR full_name ILIKE '%' || $3 || '%')
            "#,
        )
        .bind(tenant)
        .bind(role)
        .bind(search)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_users", e))?;
        let total = read_count(&count_row, "total")?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
                AND ($2::text IS NULL OR role = $2)
                AND ($3::text IS NULL OR email ILIKE '%' || $3 || '%' OR full_name ILIKE '%' || $3 || '%')
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(tenant)
        .bind(role)
        .bind(search)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        let items = rows.iter().map(user_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Paged { items, total, page: page.page, limit: page.limit })
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET full_name = $2, role = $3, is_active = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        expect_one(result.rows_affected(), "user")
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId, reassign_to: UserId) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;

        sqlx::query("UPDATE projects SET created_by = $2 WHERE created_by = $1")
            .bind(id.as_uuid())
            .bind(reassign_to.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("reassign_projects", e))?;

        sqlx::query("UPDATE tasks SET assigned_to = NULL WHERE assigned_to = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("unassign_tasks", e))?;

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound("user".to_string()));
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self, row), fields(kind = row.kind().as_str()), err)]
    async fn insert_countable(&self, row: CountableRow) -> Result<QuotaUsage, StoreError> {
        let kind = row.kind();
        let tenant_id = row
            .tenant_id()
            .ok_or_else(|| StoreError::Backend("countable row without tenant".to_string()))?;

        let mut tx = self.begin().await?;

        let limits = sqlx::query("SELECT max_users, max_projects FROM tenants WHERE id = $1 FOR UPDATE")
            .bind(tenant_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_tenant", e))?;

        let Some(limits) = limits else {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound("tenant".to_string()));
        };

        let column = match kind {
            ResourceKind::User => "max_users",
            ResourceKind::Project => "max_projects",
        };
        let limit: i32 = limits
            .try_get(column)
            .map_err(|e| StoreError::Backend(format!("failed to read {column}: {e}")))?;
        let limit = u32::try_from(limit).unwrap_or(0);

        let count_sql = match kind {
            ResourceKind::User => "SELECT COUNT(*) AS used FROM users WHERE tenant_id = $1",
            ResourceKind::Project => "SELECT COUNT(*) AS used FROM projects WHERE tenant_id = $1",
        };
        let count_row = sqlx::query(count_sql)
            .bind(tenant_id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("count_usage", e))?;
        let used = read_count(&count_row, "used")?;

        let used_after = match quota::reserve(kind, used, limit) {
            Reservation::Rejected { limit, .. } => {
                tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::LimitReached { kind, limit });
            }
            Reservation::Reserved { used_after, .. } => used_after,
        };

        let inserted = match &row {
            CountableRow::User(user) => insert_user(&mut tx, user).await.map_err(|e| match e {
                StoreError::Conflict(_) => {
                    StoreError::Conflict(format!("email '{}' already exists in this tenant", user.email))
                }
                other => other,
            }),
            CountableRow::Project(project) => insert_project(&mut tx, project).await,
        };
        if let Err(err) = inserted {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(err);
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(QuotaUsage { kind, used: used_after, limit })
    }

    #[instrument(skip(self), err)]
    async fn find_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_project", e))?;
        row.as_ref().map(project_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_projects(
        &self,
        scope: TenantScope,
        filter: &ProjectFilter,
        page: Page,
    ) -> Result<Paged<ProjectSummary>, StoreError> {
        let tenant = scope_param(scope);
        let status = filter.status.map(|s| s.as_str());
        let search = filter.search.as_deref();

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total FROM projects
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
                AND ($2::text IS NULL OR status = $2)
                AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%' OR description ILIKE '%' || $3 || '%')
            "#,
        )
        .bind(tenant)
        .bind(status)
        .bind(search)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_projects", e))?;
        let total = read_count(&count_row, "total")?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {PROJECT_COLUMNS},
                (SELECT COUNT(*) FROM tasks t WHERE t.project_id = projects.id) AS task_count,
                (SELECT COUNT(*) FROM tasks t WHERE t.project_id = projects.id AND t.status = 'completed') AS completed_task_count
            FROM projects
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
                AND ($2::text IS NULL OR status = $2)
                AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%' OR description ILIKE '%' || $3 || '%')
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(tenant)
        .bind(status)
        .bind(search)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_projects", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(ProjectSummary {
                project: project_from_row(row)?,
                task_count: read_count(row, "task_count")?,
                completed_task_count: read_count(row, "completed_task_count")?,
            });
        }
        Ok(Paged { items, total, page: page.page, limit: page.limit })
    }

    #[instrument(skip(self, project), fields(project_id = %project.id), err)]
    async fn update_project(&self, project: &Project) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE projects SET name = $2, description = $3, status = $4, created_by = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status.as_str())
        .bind(project.created_by.as_uuid())
        .bind(project.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_project", e))?;
        expect_one(result.rows_affected(), "project")
    }

    #[instrument(skip(self), err)]
    async fn delete_project(&self, id: ProjectId) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;

        sqlx::query("DELETE FROM tasks WHERE project_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_project_tasks", e))?;

        let deleted = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_project", e))?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound("project".to_string()));
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self, task), fields(task_id = %task.id, project_id = %task.project_id), err)]
    async fn insert_task(&self, task: Task) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, project_id, tenant_id, title, description, status, priority, assigned_to, due_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(task.id.as_uuid())
        .bind(task.project_id.as_uuid())
        .bind(task.tenant_id.as_uuid())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.assigned_to.map(Uuid::from))
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_task", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn find_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_task", e))?;
        row.as_ref().map(task_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_tasks(
        &self,
        project_id: ProjectId,
        filter: &TaskFilter,
        page: Page,
    ) -> Result<Paged<Task>, StoreError> {
        let status = filter.status.map(|s| s.as_str());
        let priority = filter.priority.map(|p| p.as_str());
        let assignee = filter.assigned_to.map(Uuid::from);
        let search = filter.search.as_deref();

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total FROM tasks
            WHERE project_id = $1
                AND ($2::text IS NULL OR status = $2)
                AND ($3::text IS NULL OR priority = $3)
                AND ($4::uuid IS NULL OR assigned_to = $4)
                AND ($5::text IS NULL OR title ILIKE '%' || $5 || '%' OR description ILIKE '%' || $5 || '%')
            "#,
        )
        .bind(project_id.as_uuid())
        .bind(status)
        .bind(priority)
        .bind(assignee)
        .bind(search)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_tasks", e))?;
        let total = read_count(&count_row, "total")?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM tasks
            WHERE project_id = $1
                AND ($2::text IS NULL OR status = $2)
                AND ($3::text IS NULL OR priority = $3)
                AND ($4::uuid IS NULL OR assigned_to = $4)
                AND ($5::text IS NULL OR title ILIKE '%' || $5 || '%' OR description ILIKE '%' || $5 || '%')
            ORDER BY
                CASE priority WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END,
                due_date ASC NULLS LAST,
                created_at ASC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(project_id.as_uuid())
        .bind(status)
        .bind(priority)
        .bind(assignee)
        .bind(search)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_tasks", e))?;

        let items = rows.iter().map(task_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Paged { items, total, page: page.page, limit: page.limit })
    }

    #[instrument(skip(self, task), fields(task_id = %task.id), err)]
    async fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, status = $4, priority = $5, assigned_to = $6, due_date = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(task.id.as_uuid())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.assigned_to.map(Uuid::from))
        .bind(task.due_date)
        .bind(task.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_task", e))?;
        expect_one(result.rows_affected(), "task")
    }

    #[instrument(skip(self), err)]
    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_task", e))?;
        expect_one(result.rows_affected(), "task")
    }

    async fn append_audit(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, tenant_id, user_id, action, entity_type, entity_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.tenant_id.map(Uuid::from))
        .bind(entry.actor_user_id.as_uuid())
        .bind(entry.action.as_str())
        .bind(entry.entity_type.as_str())
        .bind(entry.entity_id)
        .bind(entry.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_audit", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_audit_entries(
        &self,
        scope: TenantScope,
        filter: &AuditFilter,
        page: Page,
    ) -> Result<Paged<AuditLogEntry>, StoreError> {
        let tenant = scope_param(scope);
        let action = filter.action.map(|a| a.as_str());
        let entity = filter.entity_type.map(|e| e.as_str());
        let actor = filter.actor_user_id.map(Uuid::from);

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total FROM audit_logs
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
                AND ($2::text IS NULL OR action = $2)
                AND ($3::text IS NULL OR entity_type = $3)
                AND ($4::uuid IS NULL OR user_id = $4)
            "#,
        )
        .bind(tenant)
        .bind(action)
        .bind(entity)
        .bind(actor)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_audit", e))?;
        let total = read_count(&count_row, "total")?;

        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, user_id, action, entity_type, entity_id, created_at
            FROM audit_logs
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
                AND ($2::text IS NULL OR action = $2)
                AND ($3::text IS NULL OR entity_type = $3)
                AND ($4::uuid IS NULL OR user_id = $4)
            ORDER BY created_at DESC, id DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(tenant)
        .bind(action)
        .bind(entity)
        .bind(actor)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_audit", e))?;

        let items = rows.iter().map(audit_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Paged { items, total, page: page.page, limit: page.limit })
    }
}

fn expect_one(rows_affected: u64, what: &str) -> Result<(), StoreError> {
    if rows_affected == 0 {
        Err(StoreError::NotFound(what.to_string()))
    } else {
        Ok(())
    }
}

// ── row decoding ─────────────────────────────────────────────────────────

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Backend(format!("failed to read column {column}: {e}")))
}

fn bad_value(column: &str, value: &str) -> StoreError {
    StoreError::Backend(format!("unexpected value '{value}' in column {column}"))
}

fn tenant_from_row(row: &PgRow) -> Result<Tenant, StoreError> {
    let status: String = get(row, "status")?;
    let plan: String = get(row, "subscription_plan")?;
    let max_users: i32 = get(row, "max_users")?;
    let max_projects: i32 = get(row, "max_projects")?;
    Ok(Tenant {
        id: TenantId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        subdomain: get(row, "subdomain")?,
        status: TenantStatus::parse(&status).map_err(|_| bad_value("status", &status))?,
        subscription_plan: SubscriptionPlan::parse(&plan).map_err(|_| bad_value("subscription_plan", &plan))?,
        max_users: u32::try_from(max_users).unwrap_or(0),
        max_projects: u32::try_from(max_projects).unwrap_or(0),
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
        updated_at: get::<DateTime<Utc>>(row, "updated_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<UserAccount, StoreError> {
    let role: String = get(row, "role")?;
    Ok(UserAccount {
        id: UserId::from_uuid(get(row, "id")?),
        tenant_id: get::<Option<Uuid>>(row, "tenant_id")?.map(TenantId::from_uuid),
        email: get(row, "email")?,
        password_hash: get(row, "password_hash")?,
        full_name: get(row, "full_name")?,
        role: role.parse::<Role>().map_err(|_| bad_value("role", &role))?,
        is_active: get(row, "is_active")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
        updated_at: get::<DateTime<Utc>>(row, "updated_at")?,
    })
}

fn project_from_row(row: &PgRow) -> Result<Project, StoreError> {
    let status: String = get(row, "status")?;
    Ok(Project {
        id: ProjectId::from_uuid(get(row, "id")?),
        tenant_id: TenantId::from_uuid(get(row, "tenant_id")?),
        name: get(row, "name")?,
        description: get(row, "description")?,
        status: ProjectStatus::parse(&status).map_err(|_| bad_value("status", &status))?,
        created_by: UserId::from_uuid(get(row, "created_by")?),
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
        updated_at: get::<DateTime<Utc>>(row, "updated_at")?,
    })
}

fn task_from_row(row: &PgRow) -> Result<Task, StoreError> {
    let status: String = get(row, "status")?;
    let priority: String = get(row, "priority")?;
    Ok(Task {
        id: TaskId::from_uuid(get(row, "id")?),
        project_id: ProjectId::from_uuid(get(row, "project_id")?),
        tenant_id: TenantId::from_uuid(get(row, "tenant_id")?),
        title: get(row, "title")?,
        description: get(row, "description")?,
        status: TaskStatus::parse(&status).map_err(|_| bad_value("status", &status))?,
        priority: TaskPriority::parse(&priority).map_err(|_| bad_value("priority", &priority))?,
        assigned_to: get::<Option<Uuid>>(row, "assigned_to")?.map(UserId::from_uuid),
        due_date: get::<Option<NaiveDate>>(row, "due_date")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
        updated_at: get::<DateTime<Utc>>(row, "updated_at")?,
    })
}

fn audit_from_row(row: &PgRow) -> Result<AuditLogEntry, StoreError> {
    let action: String = get(row, "action")?;
    let entity: String = get(row, "entity_type")?;
    Ok(AuditLogEntry {
        id: AuditEntryId::from_uuid(get(row, "id")?),
        tenant_id: get::<Option<Uuid>>(row, "tenant_id")?.map(TenantId::from_uuid),
        actor_user_id: UserId::from_uuid(get(row, "user_id")?),
        action: AuditAction::parse(&action).ok_or_else(|| bad_value("action", &action))?,
        entity_type: EntityType::parse(&entity).ok_or_else(|| bad_value("entity_type", &entity))?,
        entity_id: get(row, "entity_id")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
    })
}

// ── error mapping ────────────────────────────────────────────────────────

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::NotFound(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(operation.to_string()),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
