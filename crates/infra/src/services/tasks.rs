use chrono::Utc;

use workhive_auth::{Action, ResourceScope, SessionContext};
use workhive_core::{ProjectId, TaskId, TenantId, UserId};
use workhive_tenancy::{
    AuditAction, EntityType, NewTask, Page, Paged, Task, TaskFilter, TaskPatch, TaskStatus,
};

use super::{ServiceError, ServiceResult, WorkspaceServices};
use crate::store::WorkspaceStore;

impl<S: WorkspaceStore> WorkspaceServices<S> {
    pub async fn create_task(
        &self,
        ctx: &SessionContext,
        project_id: ProjectId,
        input: NewTask,
    ) -> ServiceResult<Task> {
        let project = self.load_project(project_id).await?;
        self.guard(ctx, Action::CreateTask, ResourceScope::tenant(project.tenant_id))?;

        self.ensure_assignee(project.tenant_id, input.assigned_to).await?;
        let task = input.into_task(&project, Utc::now())?;
        self.store.insert_task(task.clone()).await?;

        self.audit
            .record(Some(task.tenant_id), ctx.actor_id(), AuditAction::CreateTask, EntityType::Task, task.id)
            .await;

        Ok(task)
    }

    pub async fn list_tasks(
        &self,
        ctx: &SessionContext,
        project_id: ProjectId,
        filter: &TaskFilter,
        page: Page,
    ) -> ServiceResult<Paged<Task>> {
        let project = self.load_project(project_id).await?;
        self.guard(ctx, Action::ListTasks, ResourceScope::tenant(project.tenant_id))?;
        Ok(self.store.list_tasks(project.id, filter, page).await?)
    }

    /// Move a task through its workflow. Members may only move tasks that
    /// are unassigned or assigned to them.
    pub async fn update_task_status(
        &self,
        ctx: &SessionContext,
        id: TaskId,
        status: TaskStatus,
    ) -> ServiceResult<Task> {
        let mut task = self.load_task(id).await?;
        self.guard(
            ctx,
            Action::UpdateTaskStatus,
            ResourceScope::owned(task.tenant_id, task.assigned_to),
        )?;

        task.status = status;
        task.updated_at = Utc::now();
        self.store.update_task(&task).await?;

        self.audit
            .record(
                Some(task.tenant_id),
                ctx.actor_id(),
                AuditAction::UpdateTaskStatus,
                EntityType::Task,
                task.id,
            )
            .await;

        Ok(task)
    }

    pub async fn update_task(&self, ctx: &SessionContext, id: TaskId, patch: TaskPatch) -> ServiceResult<Task> {
        let mut task = self.load_task(id).await?;
        self.guard(ctx, Action::UpdateTask, ResourceScope::tenant(task.tenant_id))?;

        let patch = patch.validated()?;
        self.ensure_assignee(task.tenant_id, patch.new_assignee()).await?;
        patch.apply(&mut task, Utc::now());
        self.store.update_task(&task).await?;

        self.audit
            .record(Some(task.tenant_id), ctx.actor_id(), AuditAction::UpdateTask, EntityType::Task, task.id)
            .await;

        Ok(task)
    }

    pub async fn delete_task(&self, ctx: &SessionContext, id: TaskId) -> ServiceResult<()> {
        let task = self.load_task(id).await?;
        self.guard(ctx, Action::DeleteTask, ResourceScope::tenant(task.tenant_id))?;

        self.store.delete_task(task.id).await?;

        self.audit
            .record(Some(task.tenant_id), ctx.actor_id(), AuditAction::DeleteTask, EntityType::Task, task.id)
            .await;

        Ok(())
    }

    async fn load_task(&self, id: TaskId) -> ServiceResult<Task> {
        self.store
            .find_task(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("task"))
    }

    /// An assignee must be an account of the task's own tenant.
    async fn ensure_assignee(&self, tenant_id: TenantId, assignee: Option<UserId>) -> ServiceResult<()> {
        let Some(user_id) = assignee else {
            return Ok(());
        };
        match self.store.find_user(user_id).await? {
            Some(user) if user.tenant_id == Some(tenant_id) => Ok(()),
            _ => Err(ServiceError::validation("assignee must belong to the same tenant")),
        }
    }
}
