use chrono::{DateTime, Utc};

use workhive_core::{TenantId, UserId};

use crate::{validate_claims, AuthError, Role, SessionClaims};

/// Which tenants a read may observe.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TenantScope {
    /// Every tenant (super_admin reads).
    All,
    /// A single tenant.
    Only(TenantId),
}

impl TenantScope {
    pub fn permits(&self, tenant_id: Option<TenantId>) -> bool {
        match self {
            TenantScope::All => true,
            TenantScope::Only(own) => tenant_id == Some(*own),
        }
    }
}

/// Trusted identity for a single request.
///
/// Built once from verified claims and never mutated afterwards. The fields
/// are private so no caller can widen its own privileges mid-request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionContext {
    actor_id: UserId,
    tenant_id: Option<TenantId>,
    role: Role,
}

impl SessionContext {
    /// Build a context, rejecting claim sets where tenant presence does not
    /// match the role.
    pub fn new(actor_id: UserId, tenant_id: Option<TenantId>, role: Role) -> Result<Self, AuthError> {
        match (role.is_tenant_bound(), tenant_id) {
            (true, None) => Err(AuthError::InconsistentClaims(format!(
                "role '{role}' requires a tenant"
            ))),
            (false, Some(_)) => Err(AuthError::InconsistentClaims(format!(
                "role '{role}' cannot be bound to a tenant"
            ))),
            _ => Ok(Self { actor_id, tenant_id, role }),
        }
    }

    /// Validate the claim window and build the context.
    pub fn from_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<Self, AuthError> {
        validate_claims(claims, now)?;
        Self::new(claims.user_id, claims.tenant_id, claims.role)
    }

    pub fn actor_id(&self) -> UserId {
        self.actor_id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Tenant filter applied to every listing made under this session.
    pub fn read_scope(&self) -> TenantScope {
        match self.tenant_id {
            Some(t) if self.role.is_tenant_bound() => TenantScope::Only(t),
            _ => TenantScope::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_must_not_carry_a_tenant() {
        let err = SessionContext::new(UserId::new(), Some(TenantId::new()), Role::SuperAdmin).unwrap_err();
        assert!(matches!(err, AuthError::InconsistentClaims(_)));
    }

    #[test]
    fn tenant_roles_require_a_tenant() {
        for role in [Role::TenantAdmin, Role::User] {
            assert!(SessionContext::new(UserId::new(), None, role).is_err());
        }
    }

    #[test]
    fn read_scope_follows_role() {
        let t = TenantId::new();
        let admin = SessionContext::new(UserId::new(), Some(t), Role::TenantAdmin).unwrap();
        assert_eq!(admin.read_scope(), TenantScope::Only(t));
        assert!(admin.read_scope().permits(Some(t)));
        assert!(!admin.read_scope().permits(Some(TenantId::new())));
        assert!(!admin.read_scope().permits(None));

        let root = SessionContext::new(UserId::new(), None, Role::SuperAdmin).unwrap();
        assert_eq!(root.read_scope(), TenantScope::All);
    }
}
