use chrono::Utc;

use workhive_auth::{Action, ResourceScope, SessionContext};
use workhive_core::TenantId;
use workhive_tenancy::{
    AuditAction, EntityType, Page, Paged, Tenant, TenantDetails, TenantFilter, TenantPatch,
    TenantSummary,
};

use super::{ServiceError, ServiceResult, WorkspaceServices};
use crate::store::WorkspaceStore;

impl<S: WorkspaceStore> WorkspaceServices<S> {
    pub async fn get_tenant(&self, ctx: &SessionContext, id: TenantId) -> ServiceResult<TenantDetails> {
        let tenant = self.load_tenant(id).await?;
        self.guard(ctx, Action::ReadTenant, ResourceScope::tenant(tenant.id))?;
        let stats = self.store.tenant_stats(tenant.id).await?;
        Ok(TenantDetails { tenant, stats })
    }

    pub async fn list_tenants(
        &self,
        ctx: &SessionContext,
        filter: &TenantFilter,
        page: Page,
    ) -> ServiceResult<Paged<TenantSummary>> {
        self.guard(ctx, Action::ListTenants, ResourceScope::platform())?;
        Ok(self.store.list_tenants(filter, page).await?)
    }

    /// Rename a tenant and/or change its subscription.
    ///
    /// Name changes are ordinary mutations; status, plan and limits need the
    /// subscription privilege. A patch touching both must pass both checks.
    pub async fn update_tenant(
        &self,
        ctx: &SessionContext,
        id: TenantId,
        patch: TenantPatch,
    ) -> ServiceResult<Tenant> {
        let mut tenant = self.load_tenant(id).await?;
        let scope = ResourceScope::tenant(tenant.id);

        if patch.touches_name() || patch.is_empty() {
            self.guard(ctx, Action::UpdateTenant, scope)?;
        }
        if patch.touches_subscription() {
            self.guard(ctx, Action::AdministerSubscription, scope)?;
        }

        let patch = patch.validated()?;
        patch.apply(&mut tenant, Utc::now());
        self.store.update_tenant(&tenant).await?;

        let action = if patch.touches_subscription() {
            AuditAction::UpdateTenantSubscription
        } else {
            AuditAction::UpdateTenant
        };
        tracing::info!(tenant_id = %tenant.id, action = action.as_str(), "tenant updated");
        self.audit
            .record(Some(tenant.id), ctx.actor_id(), action, EntityType::Tenant, tenant.id)
            .await;

        Ok(tenant)
    }

    pub(crate) async fn load_tenant(&self, id: TenantId) -> ServiceResult<Tenant> {
        self.store
            .find_tenant(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("tenant"))
    }
}
