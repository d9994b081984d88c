use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use workhive_auth::{Role, UserPatchScope};
use workhive_core::{DomainError, DomainResult, TenantId, UserId};

use crate::validate::{normalize_email, required_text, validate_password};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: UserId,
    /// `None` only for super_admin accounts.
    pub tenant_id: Option<TenantId>,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(
        tenant_id: Option<TenantId>,
        email: String,
        password_hash: String,
        full_name: String,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            tenant_id,
            email,
            password_hash,
            full_name,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for adding a user to a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Option<Role>,
}

/// `NewUser` after shape checks; the password is still plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidNewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

impl NewUser {
    pub fn validated(self) -> DomainResult<ValidNewUser> {
        let email = normalize_email(&self.email)?;
        validate_password(&self.password)?;
        let full_name = required_text("fullName", &self.full_name)?;
        let role = self.role.unwrap_or(Role::User);
        ensure_tenant_role(role)?;
        Ok(ValidNewUser { email, password: self.password, full_name, role })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.role.is_none() && self.is_active.is_none()
    }

    pub fn scope(&self) -> UserPatchScope {
        if self.role.is_some() || self.is_active.is_some() {
            UserPatchScope::Privileged
        } else {
            UserPatchScope::ProfileOnly
        }
    }

    pub fn validated(mut self) -> DomainResult<Self> {
        if self.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        if let Some(name) = self.full_name.take() {
            self.full_name = Some(required_text("fullName", &name)?);
        }
        if let Some(role) = self.role {
            ensure_tenant_role(role)?;
        }
        Ok(self)
    }

    pub fn apply(&self, user: &mut UserAccount, now: DateTime<Utc>) {
        if let Some(name) = &self.full_name {
            user.full_name = name.clone();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(active) = self.is_active {
            user.is_active = active;
        }
        user.updated_at = now;
    }
}

fn ensure_tenant_role(role: Role) -> DomainResult<()> {
    if role.is_tenant_bound() {
        Ok(())
    } else {
        Err(DomainError::validation("role must be one of: tenant_admin, user"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_defaults_to_member_role() {
        let v = NewUser {
            email: "Bob@Acme.com".into(),
            password: "longenough".into(),
            full_name: " Bob ".into(),
            role: None,
        }
        .validated()
        .unwrap();
        assert_eq!(v.role, Role::User);
        assert_eq!(v.email, "bob@acme.com");
        assert_eq!(v.full_name, "Bob");
    }

    #[test]
    fn super_admin_cannot_be_granted_inside_a_tenant() {
        let err = NewUser {
            email: "x@acme.com".into(),
            password: "longenough".into(),
            full_name: "X".into(),
            role: Some(Role::SuperAdmin),
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let patch = UserPatch { role: Some(Role::SuperAdmin), ..Default::default() };
        assert!(patch.validated().is_err());
    }

    #[test]
    fn patch_scope() {
        let rename = UserPatch { full_name: Some("A".into()), ..Default::default() };
        assert_eq!(rename.scope(), UserPatchScope::ProfileOnly);
        let deactivate = UserPatch { full_name: Some("A".into()), is_active: Some(false), ..Default::default() };
        assert_eq!(deactivate.scope(), UserPatchScope::Privileged);
    }

    #[test]
    fn password_hash_never_serializes() {
        let u = UserAccount::new(None, "a@b.co".into(), "$argon2id$x".into(), "A".into(), Role::SuperAdmin, Utc::now());
        let v = serde_json::to_value(&u).unwrap();
        assert!(v.get("passwordHash").is_none());
        assert_eq!(v["isActive"], true);
    }
}
