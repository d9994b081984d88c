use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use workhive_core::{DomainError, DomainResult, TenantId};

use crate::validate::required_text;

pub const DEFAULT_MAX_USERS: u32 = 5;
pub const DEFAULT_MAX_PROJECTS: u32 = 3;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
    Trial,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Trial => "trial",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "trial" => Ok(Self::Trial),
            _ => Err(DomainError::validation("status must be one of: active, suspended, trial")),
        }
    }

    /// Only members of active tenants can sign in.
    pub fn allows_login(&self) -> bool {
        matches!(self, TenantStatus::Active)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Free,
    Pro,
    Enterprise,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Pro => "pro",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(DomainError::validation(
                "subscriptionPlan must be one of: free, pro, enterprise",
            )),
        }
    }
}

/// Countable per-tenant resources that carry a ceiling.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Project,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Project => "project",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub subscription_plan: SubscriptionPlan,
    pub max_users: u32,
    pub max_projects: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// A newly registered tenant: active, on the free plan, default limits.
    ///
    /// `subdomain` must already be validated.
    pub fn register(name: String, subdomain: String, now: DateTime<Utc>) -> Self {
        Self {
            id: TenantId::new(),
            name,
            subdomain,
            status: TenantStatus::Active,
            subscription_plan: SubscriptionPlan::Free,
            max_users: DEFAULT_MAX_USERS,
            max_projects: DEFAULT_MAX_PROJECTS,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn limit(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::User => self.max_users,
            ResourceKind::Project => self.max_projects,
        }
    }
}

/// Partial update of a tenant. `name` is tenant-editable; the remaining
/// fields are subscription administration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantPatch {
    pub name: Option<String>,
    pub status: Option<TenantStatus>,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub max_users: Option<u32>,
    pub max_projects: Option<u32>,
}

impl TenantPatch {
    pub fn is_empty(&self) -> bool {
        !self.touches_name() && !self.touches_subscription()
    }

    pub fn touches_name(&self) -> bool {
        self.name.is_some()
    }

    pub fn touches_subscription(&self) -> bool {
        self.status.is_some()
            || self.subscription_plan.is_some()
            || self.max_users.is_some()
            || self.max_projects.is_some()
    }

    /// Trim and check the fields that were supplied.
    pub fn validated(mut self) -> DomainResult<Self> {
        if self.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        if let Some(name) = self.name.take() {
            self.name = Some(required_text("name", &name)?);
        }
        Ok(self)
    }

    pub fn apply(&self, tenant: &mut Tenant, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            tenant.name = name.clone();
        }
        if let Some(status) = self.status {
            tenant.status = status;
        }
        if let Some(plan) = self.subscription_plan {
            tenant.subscription_plan = plan;
        }
        if let Some(max) = self.max_users {
            tenant.max_users = max;
        }
        if let Some(max) = self.max_projects {
            tenant.max_projects = max;
        }
        tenant.updated_at = now;
    }
}
