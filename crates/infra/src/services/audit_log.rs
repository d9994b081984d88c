use workhive_auth::{Action, SessionContext};
use workhive_tenancy::{AuditFilter, AuditLogEntry, Page, Paged};

use super::{ServiceResult, WorkspaceServices};
use crate::store::WorkspaceStore;

impl<S: WorkspaceStore> WorkspaceServices<S> {
    /// Newest-first audit trail of the session's tenant, or of the whole
    /// platform for super_admin.
    pub async fn list_audit_logs(
        &self,
        ctx: &SessionContext,
        filter: &AuditFilter,
        page: Page,
    ) -> ServiceResult<Paged<AuditLogEntry>> {
        self.guard(ctx, Action::ReadAuditLog, Self::home_scope(ctx))?;
        Ok(self.store.list_audit_entries(ctx.read_scope(), filter, page).await?)
    }
}
