//! Persistence seam for tenants, users, projects, tasks and audit entries.
//!
//! Stores enforce row-level uniqueness (subdomain, per-tenant email) and own
//! the two atomic primitives the services rely on:
//! - [`WorkspaceStore::create_tenant_with_admin`]: tenant and first admin
//!   become visible together or not at all.
//! - [`WorkspaceStore::insert_countable`]: count, quota check and insert as
//!   one unit.
//!
//! Stores never make access decisions; every method trusts its caller.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use workhive_auth::TenantScope;
use workhive_core::{ProjectId, TaskId, TenantId, UserId};
use workhive_tenancy::{
    AuditFilter, AuditLogEntry, Page, Paged, Project, ProjectFilter, ProjectSummary, ResourceKind,
    Task, TaskFilter, Tenant, TenantFilter, TenantStats, TenantSummary, UserAccount, UserFilter,
};

use crate::quota::QuotaUsage;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryWorkspaceStore;
pub use postgres::PostgresWorkspaceStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// Uniqueness violation.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{} limit reached ({limit})", kind.as_str())]
    LimitReached { kind: ResourceKind, limit: u32 },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// A row whose creation counts against a tenant quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountableRow {
    User(UserAccount),
    Project(Project),
}

impl CountableRow {
    pub fn kind(&self) -> ResourceKind {
        match self {
            CountableRow::User(_) => ResourceKind::User,
            CountableRow::Project(_) => ResourceKind::Project,
        }
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        match self {
            CountableRow::User(u) => u.tenant_id,
            CountableRow::Project(p) => Some(p.tenant_id),
        }
    }
}

#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    // ── tenants ──────────────────────────────────────────────────────────

    /// Insert a tenant and its first administrator atomically.
    ///
    /// Fails with `Conflict` when the subdomain is taken.
    async fn create_tenant_with_admin(&self, tenant: Tenant, admin: UserAccount) -> Result<(), StoreError>;

    async fn find_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError>;

    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError>;

    async fn update_tenant(&self, tenant: &Tenant) -> Result<(), StoreError>;

    /// Newest first, with per-tenant user and project counts.
    async fn list_tenants(&self, filter: &TenantFilter, page: Page) -> Result<Paged<TenantSummary>, StoreError>;

    async fn tenant_stats(&self, id: TenantId) -> Result<TenantStats, StoreError>;

    // ── users ────────────────────────────────────────────────────────────

    /// Insert a platform account (no tenant). Not quota-guarded.
    async fn insert_super_admin(&self, user: UserAccount) -> Result<(), StoreError>;

    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError>;

    /// Email lookup inside one tenant, or among platform accounts for `None`.
    async fn find_user_by_email(
        &self,
        tenant_id: Option<TenantId>,
        email: &str,
    ) -> Result<Option<UserAccount>, StoreError>;

    /// Newest first.
    async fn list_users(
        &self,
        scope: TenantScope,
        filter: &UserFilter,
        page: Page,
    ) -> Result<Paged<UserAccount>, StoreError>;

    async fn update_user(&self, user: &UserAccount) -> Result<(), StoreError>;

    /// Delete a user, handing their projects to `reassign_to` and clearing
    /// their task assignments, in one unit.
    async fn delete_user(&self, id: UserId, reassign_to: UserId) -> Result<(), StoreError>;

    // ── quota-guarded creation ───────────────────────────────────────────

    /// Count the tenant's existing rows of this kind, check the tenant's
    /// ceiling and insert, atomically.
    async fn insert_countable(&self, row: CountableRow) -> Result<QuotaUsage, StoreError>;

    // ── projects ─────────────────────────────────────────────────────────

    async fn find_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError>;

    /// Newest first, with task counts.
    async fn list_projects(
        &self,
        scope: TenantScope,
        filter: &ProjectFilter,
        page: Page,
    ) -> Result<Paged<ProjectSummary>, StoreError>;

    async fn update_project(&self, project: &Project) -> Result<(), StoreError>;

    /// Delete a project and all of its tasks.
    async fn delete_project(&self, id: ProjectId) -> Result<(), StoreError>;

    // ── tasks ────────────────────────────────────────────────────────────

    async fn insert_task(&self, task: Task) -> Result<(), StoreError>;

    async fn find_task(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Priority high to low, then due date ascending with undated last.
    async fn list_tasks(
        &self,
        project_id: ProjectId,
        filter: &TaskFilter,
        page: Page,
    ) -> Result<Paged<Task>, StoreError>;

    async fn update_task(&self, task: &Task) -> Result<(), StoreError>;

    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError>;

    // ── audit ────────────────────────────────────────────────────────────

    async fn append_audit(&self, entry: AuditLogEntry) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_audit_entries(
        &self,
        scope: TenantScope,
        filter: &AuditFilter,
        page: Page,
    ) -> Result<Paged<AuditLogEntry>, StoreError>;
}

#[async_trait]
impl<S> WorkspaceStore for Arc<S>
where
    S: WorkspaceStore + ?Sized,
{
    async fn create_tenant_with_admin(&self, tenant: Tenant, admin: UserAccount) -> Result<(), StoreError> {
        (**self).create_tenant_with_admin(tenant, admin).await
    }

    async fn find_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        (**self).find_tenant(id).await
    }

    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError> {
        (**self).find_tenant_by_subdomain(subdomain).await
    }

    async fn update_tenant(&self, tenant: &Tenant) -> Result<(), StoreError> {
        (**self).update_tenant(tenant).await
    }

    async fn list_tenants(&self, filter: &TenantFilter, page: Page) -> Result<Paged<TenantSummary>, StoreError> {
        (**self).list_tenants(filter, page).await
    }

    async fn tenant_stats(&self, id: TenantId) -> Result<TenantStats, StoreError> {
        (**self).tenant_stats(id).await
    }

    async fn insert_super_admin(&self, user: UserAccount) -> Result<(), StoreError> {
        (**self).insert_super_admin(user).await
    }

    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        (**self).find_user(id).await
    }

    async fn find_user_by_email(
        &self,
        tenant_id: Option<TenantId>,
        email: &str,
    ) -> Result<Option<UserAccount>, StoreError> {
        (**self).find_user_by_email(tenant_id, email).await
    }

    async fn list_users(
        &self,
        scope: TenantScope,
        filter: &UserFilter,
        page: Page,
    ) -> Result<Paged<UserAccount>, StoreError> {
        (**self).list_users(scope, filter, page).await
    }

    async fn update_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        (**self).update_user(user).await
    }

    async fn delete_user(&self, id: UserId, reassign_to: UserId) -> Result<(), StoreError> {
        (**self).delete_user(id, reassign_to).await
    }

    async fn insert_countable(&self, row: CountableRow) -> Result<QuotaUsage, StoreError> {
        (**self).insert_countable(row).await
    }

    async fn find_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        (**self).find_project(id).await
    }

    async fn list_projects(
        &self,
        scope: TenantScope,
        filter: &ProjectFilter,
        page: Page,
    ) -> Result<Paged<ProjectSummary>, StoreError> {
        (**self).list_projects(scope, filter, page).await
    }

    async fn update_project(&self, project: &Project) -> Result<(), StoreError> {
        (**self).update_project(project).await
    }

    async fn delete_project(&self, id: ProjectId) -> Result<(), StoreError> {
        (**self).delete_project(id).await
    }

    async fn insert_task(&self, task: Task) -> Result<(), StoreError> {
        (**self).insert_task(task).await
    }

    async fn find_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        (**self).find_task(id).await
    }

    async fn list_tasks(
        &self,
        project_id: ProjectId,
        filter: &TaskFilter,
        page: Page,
    ) -> Result<Paged<Task>, StoreError> {
        (**self).list_tasks(project_id, filter, page).await
    }

    async fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        (**self).update_task(task).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        (**self).delete_task(id).await
    }

    async fn append_audit(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        (**self).append_audit(entry).await
    }

    async fn list_audit_entries(
        &self,
        scope: TenantScope,
        filter: &AuditFilter,
        page: Page,
    ) -> Result<Paged<AuditLogEntry>, StoreError> {
        (**self).list_audit_entries(scope, filter, page).await
    }
}
