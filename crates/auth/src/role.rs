use core::str::FromStr;

use serde::{Deserialize, Serialize};

use workhive_core::DomainError;

/// The three roles a session can carry.
///
/// `SuperAdmin` is platform-wide and belongs to no tenant; the other two are
/// always bound to exactly one tenant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    TenantAdmin,
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::SuperAdmin, Role::TenantAdmin, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::TenantAdmin => "tenant_admin",
            Role::User => "user",
        }
    }

    /// Whether sessions with this role must carry a tenant id.
    pub fn is_tenant_bound(&self) -> bool {
        !matches!(self, Role::SuperAdmin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "tenant_admin" => Ok(Role::TenantAdmin),
            "user" => Ok(Role::User),
            other => Err(DomainError::validation(format!(
                "role must be one of: super_admin, tenant_admin, user (got '{other}')"
            ))),
        }
    }
}
