//! In-memory workspace store for tests and local development.
//!
//! All tables sit behind one `RwLock`, so every write method (including the
//! quota-guarded insert) is a single critical section.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use workhive_auth::TenantScope;
use workhive_core::{ProjectId, TaskId, TenantId, UserId};
use workhive_tenancy::query::matches_search;
use workhive_tenancy::{
    AuditFilter, AuditLogEntry, Page, Paged, Project, ProjectFilter, ProjectSummary, Task,
    TaskFilter, TaskStatus, Tenant, TenantFilter, TenantStats, TenantSummary, UserAccount,
    UserFilter,
};

use super::{CountableRow, StoreError, WorkspaceStore};
use crate::quota::{self, QuotaUsage, Reservation};

#[derive(Debug, Default)]
struct Tables {
    tenants: HashMap<TenantId, Tenant>,
    users: HashMap<UserId, UserAccount>,
    projects: HashMap<ProjectId, Project>,
    tasks: HashMap<TaskId, Task>,
    audit: Vec<AuditLogEntry>,
}

impl Tables {
    fn email_taken(&self, tenant_id: Option<TenantId>, email: &str) -> bool {
        self.users
            .values()
            .any(|u| u.tenant_id == tenant_id && u.email == email)
    }

    fn count_users(&self, tenant_id: TenantId) -> u64 {
        self.users.values().filter(|u| u.tenant_id == Some(tenant_id)).count() as u64
    }

    fn count_projects(&self, tenant_id: TenantId) -> u64 {
        self.projects.values().filter(|p| p.tenant_id == tenant_id).count() as u64
    }

    fn count_tasks(&self, tenant_id: TenantId) -> u64 {
        self.tasks.values().filter(|t| t.tenant_id == tenant_id).count() as u64
    }

    fn summarize_project(&self, project: &Project) -> ProjectSummary {
        let (task_count, completed_task_count) = self
            .tasks
            .values()
            .filter(|t| t.project_id == project.id)
            .fold((0, 0), |(all, done), t| {
                (all + 1, done + u64::from(t.status == TaskStatus::Completed))
            });
        ProjectSummary {
            project: project.clone(),
            task_count,
            completed_task_count,
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWorkspaceStore {
    inner: RwLock<Tables>,
}

impl InMemoryWorkspaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl WorkspaceStore for InMemoryWorkspaceStore {
    async fn create_tenant_with_admin(&self, tenant: Tenant, admin: UserAccount) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.tenants.values().any(|x| x.subdomain == tenant.subdomain) {
            return Err(StoreError::Conflict(format!(
                "subdomain '{}' is already taken",
                tenant.subdomain
            )));
        }
        t.users.insert(admin.id, admin);
        t.tenants.insert(tenant.id, tenant);
        Ok(())
    }

    async fn find_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        Ok(self.read()?.tenants.get(&id).cloned())
    }

    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError> {
        Ok(self.read()?.tenants.values().find(|t| t.subdomain == subdomain).cloned())
    }

    async fn update_tenant(&self, tenant: &Tenant) -> Result<(), StoreError> {
        let mut t = self.write()?;
        match t.tenants.get_mut(&tenant.id) {
            Some(row) => {
                *row = tenant.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("tenant".to_string())),
        }
    }

    async fn list_tenants(&self, filter: &TenantFilter, page: Page) -> Result<Paged<TenantSummary>, StoreError> {
        let t = self.read()?;
        let mut rows: Vec<&Tenant> = t
            .tenants
            .values()
            .filter(|x| filter.status.is_none_or(|s| s == x.status))
            .filter(|x| filter.subscription_plan.is_none_or(|p| p == x.subscription_plan))
            .collect();
        rows.sort_by_key(|x| Reverse((x.created_at, x.id)));

        let summaries = rows
            .into_iter()
            .map(|x| TenantSummary {
                tenant: x.clone(),
                total_users: t.count_users(x.id),
                total_projects: t.count_projects(x.id),
            })
            .collect();
        Ok(page.slice(summaries))
    }

    async fn tenant_stats(&self, id: TenantId) -> Result<TenantStats, StoreError> {
        let t = self.read()?;
        Ok(TenantStats {
            total_users: t.count_users(id),
            total_projects: t.count_projects(id),
            total_tasks: t.count_tasks(id),
        })
    }

    async fn insert_super_admin(&self, user: UserAccount) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.email_taken(None, &user.email) {
            return Err(StoreError::Conflict(format!("email '{}' is already registered", user.email)));
        }
        t.users.insert(user.id, user);
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(
        &self,
        tenant_id: Option<TenantId>,
        email: &str,
    ) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.tenant_id == tenant_id && u.email == email)
            .cloned())
    }

    async fn list_users(
        &self,
        scope: TenantScope,
        filter: &UserFilter,
        page: Page,
    ) -> Result<Paged<UserAccount>, StoreError> {
        let t = self.read()?;
        let mut rows: Vec<UserAccount> = t
            .users
            .values()
            .filter(|u| scope.permits(u.tenant_id))
            .filter(|u| filter.role.is_none_or(|r| r == u.role))
            .filter(|u| matches_search(&filter.search, &[&u.email, &u.full_name]))
            .cloned()
            .collect();
        rows.sort_by_key(|u| Reverse((u.created_at, u.id)));
        Ok(page.slice(rows))
    }

    async fn update_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let mut t = self.write()?;
        match t.users.get_mut(&user.id) {
            Some(row) => {
                *row = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("user".to_string())),
        }
    }

    async fn delete_user(&self, id: UserId, reassign_to: UserId) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.users.remove(&id).is_none() {
            return Err(StoreError::NotFound("user".to_string()));
        }
        for project in t.projects.values_mut().filter(|p| p.created_by == id) {
            project.created_by = reassign_to;
        }
        for task in t.tasks.values_mut().filter(|x| x.assigned_to == Some(id)) {
            task.assigned_to = None;
        }
        Ok(())
    }

    async fn insert_countable(&self, row: CountableRow) -> Result<QuotaUsage, StoreError> {
        let kind = row.kind();
        let tenant_id = row
            .tenant_id()
            .ok_or_else(|| StoreError::Backend("countable row without tenant".to_string()))?;

        let mut t = self.write()?;
        let limit = t
            .tenants
            .get(&tenant_id)
            .map(|x| x.limit(kind))
            .ok_or_else(|| StoreError::NotFound("tenant".to_string()))?;

        let used = match &row {
            CountableRow::User(_) => t.count_users(tenant_id),
            CountableRow::Project(_) => t.count_projects(tenant_id),
        };

        let used_after = match quota::reserve(kind, used, limit) {
            Reservation::Rejected { limit, .. } => return Err(StoreError::LimitReached { kind, limit }),
            Reservation::Reserved { used_after, .. } => used_after,
        };

        match row {
            CountableRow::User(user) => {
                if t.email_taken(user.tenant_id, &user.email) {
                    return Err(StoreError::Conflict(format!(
                        "email '{}' already exists in this tenant",
                        user.email
                    )));
                }
                t.users.insert(user.id, user);
            }
            CountableRow::Project(project) => {
                t.projects.insert(project.id, project);
            }
        }

        Ok(QuotaUsage { kind, used: used_after, limit })
    }

    async fn find_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.read()?.projects.get(&id).cloned())
    }

    async fn list_projects(
        &self,
        scope: TenantScope,
        filter: &ProjectFilter,
        page: Page,
    ) -> Result<Paged<ProjectSummary>, StoreError> {
        let t = self.read()?;
        let mut rows: Vec<&Project> = t
            .projects
            .values()
            .filter(|p| scope.permits(Some(p.tenant_id)))
            .filter(|p| filter.status.is_none_or(|s| s == p.status))
            .filter(|p| {
                matches_search(
                    &filter.search,
                    &[&p.name, p.description.as_deref().unwrap_or_default()],
                )
            })
            .collect();
        rows.sort_by_key(|p| Reverse((p.created_at, p.id)));
        let summaries = rows.into_iter().map(|p| t.summarize_project(p)).collect();
        Ok(page.slice(summaries))
    }

    async fn update_project(&self, project: &Project) -> Result<(), StoreError> {
        let mut t = self.write()?;
        match t.projects.get_mut(&project.id) {
            Some(row) => {
                *row = project.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("project".to_string())),
        }
    }

    async fn delete_project(&self, id: ProjectId) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.projects.remove(&id).is_none() {
            return Err(StoreError::NotFound("project".to_string()));
        }
        t.tasks.retain(|_, task| task.project_id != id);
        Ok(())
    }

    async fn insert_task(&self, task: Task) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if !t.projects.contains_key(&task.project_id) {
            return Err(StoreError::NotFound("project".to_string()));
        }
        t.tasks.insert(task.id, task);
        Ok(())
    }

    async fn find_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn list_tasks(
        &self,
        project_id: ProjectId,
        filter: &TaskFilter,
        page: Page,
    ) -> Result<Paged<Task>, StoreError> {
        let t = self.read()?;
        let mut rows: Vec<Task> = t
            .tasks
            .values()
            .filter(|x| x.project_id == project_id)
            .filter(|x| filter.status.is_none_or(|s| s == x.status))
            .filter(|x| filter.priority.is_none_or(|p| p == x.priority))
            .filter(|x| filter.assigned_to.is_none_or(|u| Some(u) == x.assigned_to))
            .filter(|x| {
                matches_search(
                    &filter.search,
                    &[&x.title, x.description.as_deref().unwrap_or_default()],
                )
            })
            .cloned()
            .collect();
        rows.sort_by_key(|x| (Reverse(x.priority), x.due_date.is_none(), x.due_date, x.created_at));
        Ok(page.slice(rows))
    }

    async fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut t = self.write()?;
        match t.tasks.get_mut(&task.id) {
            Some(row) => {
                *row = task.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("task".to_string())),
        }
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        let mut t = self.write()?;
        match t.tasks.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound("task".to_string())),
        }
    }

    async fn append_audit(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        self.write()?.audit.push(entry);
        Ok(())
    }

    async fn list_audit_entries(
        &self,
        scope: TenantScope,
        filter: &AuditFilter,
        page: Page,
    ) -> Result<Paged<AuditLogEntry>, StoreError> {
        let t = self.read()?;
        let mut rows: Vec<AuditLogEntry> = t
            .audit
            .iter()
            .filter(|e| scope.permits(e.tenant_id))
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        rows.sort_by_key(|e| Reverse((e.created_at, e.id)));
        Ok(page.slice(rows))
    }
}
