use chrono::Utc;

use workhive_auth::{Action, ResourceScope, SessionContext, TenantScope};
use workhive_core::{TenantId, UserId};
use workhive_tenancy::{
    AuditAction, EntityType, NewUser, Page, Paged, UserAccount, UserFilter, UserPatch,
};

use super::{ServiceError, ServiceResult, WorkspaceServices};
use crate::store::{CountableRow, WorkspaceStore};

impl<S: WorkspaceStore> WorkspaceServices<S> {
    /// Add a member to `tenant_id`, counted against the tenant's user quota.
    pub async fn add_user(
        &self,
        ctx: &SessionContext,
        tenant_id: TenantId,
        input: NewUser,
    ) -> ServiceResult<UserAccount> {
        let tenant = self.load_tenant(tenant_id).await?;
        self.guard(ctx, Action::CreateUser, ResourceScope::tenant(tenant.id))?;

        let input = input.validated()?;
        let password_hash = self.hash_password(&input.password).await?;
        let user = UserAccount::new(
            Some(tenant.id),
            input.email,
            password_hash,
            input.full_name,
            input.role,
            Utc::now(),
        );

        let usage = self.store.insert_countable(CountableRow::User(user.clone())).await?;
        tracing::info!(
            tenant_id = %tenant.id,
            user_id = %user.id,
            used = usage.used,
            limit = usage.limit,
            "user added"
        );
        self.audit
            .record(Some(tenant.id), ctx.actor_id(), AuditAction::CreateUser, EntityType::User, user.id)
            .await;

        Ok(user)
    }

    /// List users of one tenant, or of every tenant the session can read
    /// when `tenant_id` is `None`.
    pub async fn list_users(
        &self,
        ctx: &SessionContext,
        tenant_id: Option<TenantId>,
        filter: &UserFilter,
        page: Page,
    ) -> ServiceResult<Paged<UserAccount>> {
        let scope = match tenant_id {
            Some(t) => {
                self.guard(ctx, Action::ListUsers, ResourceScope::tenant(t))?;
                TenantScope::Only(t)
            }
            None => {
                self.guard(ctx, Action::ListUsers, Self::home_scope(ctx))?;
                ctx.read_scope()
            }
        };
        Ok(self.store.list_users(scope, filter, page).await?)
    }

    pub async fn update_user(
        &self,
        ctx: &SessionContext,
        id: UserId,
        patch: UserPatch,
    ) -> ServiceResult<UserAccount> {
        let mut user = self.load_user(id).await?;
        self.guard(ctx, Action::UpdateUser(patch.scope()), Self::account_scope(&user))?;

        let patch = patch.validated()?;
        patch.apply(&mut user, Utc::now());
        self.store.update_user(&user).await?;

        self.audit
            .record(user.tenant_id, ctx.actor_id(), AuditAction::UpdateUser, EntityType::User, user.id)
            .await;

        Ok(user)
    }

    /// Remove an account. Projects it created pass to the caller and its
    /// task assignments are cleared, in the same unit as the delete.
    pub async fn delete_user(&self, ctx: &SessionContext, id: UserId) -> ServiceResult<()> {
        let user = self.load_user(id).await?;
        self.guard(ctx, Action::DeleteUser, Self::account_scope(&user))?;

        self.store.delete_user(user.id, ctx.actor_id()).await?;

        tracing::info!(user_id = %user.id, reassigned_to = %ctx.actor_id(), "user deleted");
        self.audit
            .record(user.tenant_id, ctx.actor_id(), AuditAction::DeleteUser, EntityType::User, user.id)
            .await;

        Ok(())
    }

    async fn load_user(&self, id: UserId) -> ServiceResult<UserAccount> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))
    }

    /// The target account is the owner for user updates and deletes.
    fn account_scope(user: &UserAccount) -> ResourceScope {
        ResourceScope { tenant_id: user.tenant_id, owner_id: Some(user.id) }
    }
}
