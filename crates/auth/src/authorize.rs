use serde::Serialize;
use thiserror::Error;

use workhive_core::{TenantId, UserId};

use crate::{Action, ActionKind, Role, SessionContext, UserPatchScope};

/// Tenant and owner of the resource an action targets.
///
/// `owner_id` means different things per action: the assignee for task
/// status changes, the target account for user updates and deletes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ResourceScope {
    pub tenant_id: Option<TenantId>,
    pub owner_id: Option<UserId>,
}

impl ResourceScope {
    pub fn tenant(tenant_id: TenantId) -> Self {
        Self { tenant_id: Some(tenant_id), owner_id: None }
    }

    pub fn owned(tenant_id: TenantId, owner_id: Option<UserId>) -> Self {
        Self { tenant_id: Some(tenant_id), owner_id }
    }

    /// Platform-wide target (no tenant).
    pub fn platform() -> Self {
        Self::default()
    }
}

#[derive(Debug, Error, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    #[error("super_admin sessions are read-only")]
    ReadOnlyRole,

    #[error("resource belongs to another tenant")]
    CrossTenantAccess,

    #[error("role does not permit this operation")]
    InsufficientRole,

    #[error("task is assigned to another user")]
    NotAssignee,

    #[error("administrators cannot delete their own account")]
    CannotDeleteSelf,

    #[error("subscription fields can only be changed by a super_admin")]
    FieldRequiresSuperAdmin,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::ReadOnlyRole => "read_only_role",
            DenyReason::CrossTenantAccess => "cross_tenant_access",
            DenyReason::InsufficientRole => "insufficient_role",
            DenyReason::NotAssignee => "not_assignee",
            DenyReason::CannotDeleteSelf => "cannot_delete_self",
            DenyReason::FieldRequiresSuperAdmin => "field_requires_super_admin",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// One decision strategy per role.
pub trait RolePolicy: Send + Sync {
    fn decide(&self, ctx: &SessionContext, action: Action, resource: &ResourceScope) -> Decision;
}

/// Platform operator: reads everything, administers subscriptions, never
/// mutates tenant content.
pub struct SuperAdminPolicy;

impl RolePolicy for SuperAdminPolicy {
    fn decide(&self, _ctx: &SessionContext, action: Action, _resource: &ResourceScope) -> Decision {
        match action.kind() {
            ActionKind::Read | ActionKind::Administer => Decision::Allow,
            ActionKind::Mutate => Decision::Deny(DenyReason::ReadOnlyRole),
        }
    }
}

/// Full control inside the admin's own tenant, nothing outside it.
pub struct TenantAdminPolicy;

impl RolePolicy for TenantAdminPolicy {
    fn decide(&self, ctx: &SessionContext, action: Action, resource: &ResourceScope) -> Decision {
        if action.is_platform_wide() {
            return Decision::Deny(DenyReason::InsufficientRole);
        }
        if resource.tenant_id.is_none() || resource.tenant_id != ctx.tenant_id() {
            return Decision::Deny(DenyReason::CrossTenantAccess);
        }
        match action {
            Action::AdministerSubscription => Decision::Deny(DenyReason::FieldRequiresSuperAdmin),
            Action::DeleteUser if resource.owner_id == Some(ctx.actor_id()) => {
                Decision::Deny(DenyReason::CannotDeleteSelf)
            }
            _ => Decision::Allow,
        }
    }
}

/// Regular member: reads inside the tenant, moves assigned tasks, edits own
/// profile name.
pub struct MemberPolicy;

impl RolePolicy for MemberPolicy {
    fn decide(&self, ctx: &SessionContext, action: Action, resource: &ResourceScope) -> Decision {
        if action.is_platform_wide() {
            return Decision::Deny(DenyReason::InsufficientRole);
        }
        if resource.tenant_id.is_none() || resource.tenant_id != ctx.tenant_id() {
            return Decision::Deny(DenyReason::CrossTenantAccess);
        }
        match action {
            Action::ReadAuditLog => Decision::Deny(DenyReason::InsufficientRole),
            a if a.kind() == ActionKind::Read => Decision::Allow,
            Action::UpdateTaskStatus => match resource.owner_id {
                None => Decision::Allow,
                Some(assignee) if assignee == ctx.actor_id() => Decision::Allow,
                Some(_) => Decision::Deny(DenyReason::NotAssignee),
            },
            Action::UpdateUser(UserPatchScope::ProfileOnly)
                if resource.owner_id == Some(ctx.actor_id()) =>
            {
                Decision::Allow
            }
            _ => Decision::Deny(DenyReason::InsufficientRole),
        }
    }
}

pub fn policy_for(role: Role) -> &'static dyn RolePolicy {
    match role {
        Role::SuperAdmin => &SuperAdminPolicy,
        Role::TenantAdmin => &TenantAdminPolicy,
        Role::User => &MemberPolicy,
    }
}

/// Decide whether `ctx` may perform `action` on `resource`.
///
/// - No IO
/// - No panics
/// - One policy lookup per call
pub fn authorize(ctx: &SessionContext, action: Action, resource: &ResourceScope) -> Decision {
    let decision = policy_for(ctx.role()).decide(ctx, action, resource);
    if let Decision::Deny(reason) = decision {
        tracing::debug!(
            actor_id = %ctx.actor_id(),
            role = %ctx.role(),
            action = ?action,
            reason = reason.as_str(),
            "authorization denied"
        );
    }
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn session(role: Role, tenant: Option<TenantId>) -> SessionContext {
        SessionContext::new(UserId::new(), tenant, role).unwrap()
    }

    #[test]
    fn super_admin_reads_everywhere_but_never_mutates() {
        let ctx = session(Role::SuperAdmin, None);
        let res = ResourceScope::tenant(TenantId::new());
        for action in Action::ALL {
            let d = authorize(&ctx, action, &res);
            match action.kind() {
                ActionKind::Mutate => assert_eq!(d, Decision::Deny(DenyReason::ReadOnlyRole), "{action:?}"),
                _ => assert_eq!(d, Decision::Allow, "{action:?}"),
            }
        }
    }

    #[test]
    fn tenant_admin_cannot_touch_subscription_fields() {
        let t = TenantId::new();
        let ctx = session(Role::TenantAdmin, Some(t));
        assert_eq!(
            authorize(&ctx, Action::AdministerSubscription, &ResourceScope::tenant(t)),
            Decision::Deny(DenyReason::FieldRequiresSuperAdmin)
        );
        assert!(authorize(&ctx, Action::UpdateTenant, &ResourceScope::tenant(t)).is_allowed());
    }

    #[test]
    fn tenant_admin_cannot_delete_self() {
        let t = TenantId::new();
        let ctx = session(Role::TenantAdmin, Some(t));
        let own = ResourceScope::owned(t, Some(ctx.actor_id()));
        assert_eq!(
            authorize(&ctx, Action::DeleteUser, &own),
            Decision::Deny(DenyReason::CannotDeleteSelf)
        );
        let other = ResourceScope::owned(t, Some(UserId::new()));
        assert!(authorize(&ctx, Action::DeleteUser, &other).is_allowed());
    }

    #[test]
    fn member_status_change_requires_assignment() {
        let t = TenantId::new();
        let ctx = session(Role::User, Some(t));

        let unassigned = ResourceScope::owned(t, None);
        let mine = ResourceScope::owned(t, Some(ctx.actor_id()));
        let theirs = ResourceScope::owned(t, Some(UserId::new()));

        assert!(authorize(&ctx, Action::UpdateTaskStatus, &unassigned).is_allowed());
        assert!(authorize(&ctx, Action::UpdateTaskStatus, &mine).is_allowed());
        assert_eq!(
            authorize(&ctx, Action::UpdateTaskStatus, &theirs),
            Decision::Deny(DenyReason::NotAssignee)
        );
    }

    #[test]
    fn member_may_only_rename_self() {
        let t = TenantId::new();
        let ctx = session(Role::User, Some(t));
        let me = ResourceScope::owned(t, Some(ctx.actor_id()));
        let other = ResourceScope::owned(t, Some(UserId::new()));

        assert!(authorize(&ctx, Action::UpdateUser(UserPatchScope::ProfileOnly), &me).is_allowed());
        assert_eq!(
            authorize(&ctx, Action::UpdateUser(UserPatchScope::Privileged), &me),
            Decision::Deny(DenyReason::InsufficientRole)
        );
        assert_eq!(
            authorize(&ctx, Action::UpdateUser(UserPatchScope::ProfileOnly), &other),
            Decision::Deny(DenyReason::InsufficientRole)
        );
    }

    #[test]
    fn member_cannot_create_or_delete() {
        let t = TenantId::new();
        let ctx = session(Role::User, Some(t));
        for action in [Action::CreateProject, Action::DeleteProject, Action::CreateTask, Action::CreateUser] {
            assert_eq!(
                authorize(&ctx, action, &ResourceScope::tenant(t)),
                Decision::Deny(DenyReason::InsufficientRole)
            );
        }
    }

    #[test]
    fn only_super_admin_lists_tenants() {
        let t = TenantId::new();
        for role in [Role::TenantAdmin, Role::User] {
            let ctx = session(role, Some(t));
            assert_eq!(
                authorize(&ctx, Action::ListTenants, &ResourceScope::platform()),
                Decision::Deny(DenyReason::InsufficientRole)
            );
        }
        let root = session(Role::SuperAdmin, None);
        assert!(authorize(&root, Action::ListTenants, &ResourceScope::platform()).is_allowed());
    }

    fn any_action() -> impl Strategy<Value = Action> {
        prop::sample::select(Action::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn tenant_bound_roles_never_cross_tenants(
            action in any_action(),
            admin in any::<bool>(),
            with_owner in any::<bool>(),
        ) {
            let own = TenantId::new();
            let foreign = TenantId::new();
            let role = if admin { Role::TenantAdmin } else { Role::User };
            let ctx = session(role, Some(own));
            let owner = with_owner.then(|| ctx.actor_id());

            let d = authorize(&ctx, action, &ResourceScope::owned(foreign, owner));
            prop_assert!(!d.is_allowed());
        }

        #[test]
        fn super_admin_mutations_are_always_read_only(
            action in any_action().prop_filter("mutations only", |a| a.kind() == ActionKind::Mutate),
        ) {
            let ctx = session(Role::SuperAdmin, None);
            let d = authorize(&ctx, action, &ResourceScope::tenant(TenantId::new()));
            prop_assert_eq!(d, Decision::Deny(DenyReason::ReadOnlyRole));
        }
    }
}
