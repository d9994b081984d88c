use chrono::Utc;

use workhive_auth::{Action, ResourceScope, SessionContext};
use workhive_core::ProjectId;
use workhive_tenancy::{
    AuditAction, EntityType, NewProject, Page, Paged, Project, ProjectFilter, ProjectPatch,
    ProjectSummary,
};

use super::{ServiceError, ServiceResult, WorkspaceServices};
use crate::store::{CountableRow, WorkspaceStore};

impl<S: WorkspaceStore> WorkspaceServices<S> {
    /// Create a project in the caller's tenant, counted against its quota.
    pub async fn create_project(&self, ctx: &SessionContext, input: NewProject) -> ServiceResult<Project> {
        self.guard(ctx, Action::CreateProject, Self::home_scope(ctx))?;
        let tenant_id = Self::own_tenant(ctx)?;

        let project = input.into_project(tenant_id, ctx.actor_id(), Utc::now())?;
        let usage = self.store.insert_countable(CountableRow::Project(project.clone())).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            project_id = %project.id,
            used = usage.used,
            limit = usage.limit,
            "project created"
        );
        self.audit
            .record(Some(tenant_id), ctx.actor_id(), AuditAction::CreateProject, EntityType::Project, project.id)
            .await;

        Ok(project)
    }

    pub async fn list_projects(
        &self,
        ctx: &SessionContext,
        filter: &ProjectFilter,
        page: Page,
    ) -> ServiceResult<Paged<ProjectSummary>> {
        self.guard(ctx, Action::ListProjects, Self::home_scope(ctx))?;
        Ok(self.store.list_projects(ctx.read_scope(), filter, page).await?)
    }

    pub async fn get_project(&self, ctx: &SessionContext, id: ProjectId) -> ServiceResult<Project> {
        let project = self.load_project(id).await?;
        self.guard(ctx, Action::ReadProject, ResourceScope::tenant(project.tenant_id))?;
        Ok(project)
    }

    pub async fn update_project(
        &self,
        ctx: &SessionContext,
        id: ProjectId,
        patch: ProjectPatch,
    ) -> ServiceResult<Project> {
        let mut project = self.load_project(id).await?;
        self.guard(ctx, Action::UpdateProject, ResourceScope::tenant(project.tenant_id))?;

        let patch = patch.validated()?;
        patch.apply(&mut project, Utc::now());
        self.store.update_project(&project).await?;

        self.audit
            .record(
                Some(project.tenant_id),
                ctx.actor_id(),
                AuditAction::UpdateProject,
                EntityType::Project,
                project.id,
            )
            .await;

        Ok(project)
    }

    /// Delete a project together with its tasks.
    pub async fn delete_project(&self, ctx: &SessionContext, id: ProjectId) -> ServiceResult<()> {
        let project = self.load_project(id).await?;
        self.guard(ctx, Action::DeleteProject, ResourceScope::tenant(project.tenant_id))?;

        self.store.delete_project(project.id).await?;

        self.audit
            .record(
                Some(project.tenant_id),
                ctx.actor_id(),
                AuditAction::DeleteProject,
                EntityType::Project,
                project.id,
            )
            .await;

        Ok(())
    }

    pub(crate) async fn load_project(&self, id: ProjectId) -> ServiceResult<Project> {
        self.store
            .find_project(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("project"))
    }
}
