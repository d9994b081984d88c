use chrono::Utc;
use serde::Serialize;

use workhive_auth::{IssuedToken, Role, SessionContext};
use workhive_tenancy::validate::{normalize_email, required_text, validate_password, validate_subdomain};
use workhive_tenancy::{AuditAction, EntityType, Tenant, UserAccount, UserProfile};

use super::{ServiceError, ServiceResult, WorkspaceServices};
use crate::store::{StoreError, WorkspaceStore};

const INVALID_CREDENTIALS: &str = "invalid credentials";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterTenant {
    pub tenant_name: String,
    pub subdomain: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub tenant: Tenant,
    pub admin: UserAccount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Blank or absent means a platform (super_admin) login.
    pub subdomain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub token: IssuedToken,
    pub user: UserAccount,
    pub tenant: Option<Tenant>,
}

impl<S: WorkspaceStore> WorkspaceServices<S> {
    /// Create a tenant and its first tenant_admin as one unit.
    pub async fn register_tenant(&self, input: RegisterTenant) -> ServiceResult<Registration> {
        let name = required_text("tenantName", &input.tenant_name)?;
        let subdomain = validate_subdomain(&input.subdomain)?;
        let email = normalize_email(&input.admin_email)?;
        validate_password(&input.admin_password)?;
        let full_name = required_text("adminFullName", &input.admin_full_name)?;

        if self.store.find_tenant_by_subdomain(&subdomain).await?.is_some() {
            return Err(ServiceError::Conflict(format!("subdomain '{subdomain}' is already taken")));
        }

        let password_hash = self.hash_password(&input.admin_password).await?;
        let now = Utc::now();
        let tenant = Tenant::register(name, subdomain, now);
        let admin = UserAccount::new(Some(tenant.id), email, password_hash, full_name, Role::TenantAdmin, now);

        self.store.create_tenant_with_admin(tenant.clone(), admin.clone()).await?;

        tracing::info!(tenant_id = %tenant.id, subdomain = %tenant.subdomain, "tenant registered");
        self.audit
            .record(Some(tenant.id), admin.id, AuditAction::TenantRegistration, EntityType::Tenant, tenant.id)
            .await;

        Ok(Registration { tenant, admin })
    }

    pub async fn login(&self, input: LoginRequest) -> ServiceResult<LoginOutcome> {
        let email = input.email.trim().to_ascii_lowercase();
        if email.is_empty() || input.password.is_empty() {
            return Err(ServiceError::validation("email and password are required"));
        }

        let subdomain = input
            .subdomain
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_lowercase);

        let tenant = match subdomain {
            None => None,
            Some(sub) => {
                let tenant = self
                    .store
                    .find_tenant_by_subdomain(&sub)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("tenant"))?;
                if !tenant.status.allows_login() {
                    return Err(ServiceError::Unauthenticated(format!(
                        "tenant is {}",
                        tenant.status.as_str()
                    )));
                }
                Some(tenant)
            }
        };

        let tenant_id = tenant.as_ref().map(|t| t.id);
        let user = self
            .store
            .find_user_by_email(tenant_id, &email)
            .await?
            .filter(|u| tenant_id.is_some() || u.role == Role::SuperAdmin)
            .ok_or_else(|| ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()))?;

        if !self.verify_password(&input.password, &user.password_hash).await? {
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }
        if !user.is_active {
            return Err(ServiceError::Unauthenticated("account is inactive".to_string()));
        }

        let token = self.credentials.issue_token(user.id, user.tenant_id, user.role, Utc::now())?;

        self.audit
            .record(user.tenant_id, user.id, AuditAction::Login, EntityType::User, user.id)
            .await;

        Ok(LoginOutcome { token, user, tenant })
    }

    /// The caller's own account plus its tenant.
    pub async fn current_user(&self, ctx: &SessionContext) -> ServiceResult<UserProfile> {
        let user = self
            .store
            .find_user(ctx.actor_id())
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))?;
        let tenant = match user.tenant_id {
            Some(t) => self.store.find_tenant(t).await?,
            None => None,
        };
        Ok(UserProfile { user, tenant })
    }

    /// Sessions are stateless; logging out only leaves an audit trail.
    pub async fn logout(&self, ctx: &SessionContext) -> ServiceResult<()> {
        self.audit
            .record(ctx.tenant_id(), ctx.actor_id(), AuditAction::Logout, EntityType::User, ctx.actor_id())
            .await;
        Ok(())
    }

    /// Ensure a platform account exists. Returns `true` when one was created.
    pub async fn bootstrap_super_admin(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> ServiceResult<bool> {
        let email = normalize_email(email)?;
        validate_password(password)?;
        let full_name = required_text("fullName", full_name)?;

        if self.store.find_user_by_email(None, &email).await?.is_some() {
            return Ok(false);
        }

        let hash = self.hash_password(password).await?;
        let user = UserAccount::new(None, email, hash, full_name, Role::SuperAdmin, Utc::now());
        match self.store.insert_super_admin(user).await {
            Ok(()) => Ok(true),
            Err(StoreError::Conflict(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
