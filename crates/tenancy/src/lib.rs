//! `workhive-tenancy` — the tenant-scoped data model.
//!
//! Plain data plus input validation. Storage lives in `workhive-infra`;
//! access rules live in `workhive-auth`.

pub mod audit;
pub mod project;
pub mod query;
pub mod task;
pub mod tenant;
pub mod user;
pub mod validate;

pub use audit::{AuditAction, AuditLogEntry, EntityType};
pub use project::{NewProject, Project, ProjectPatch, ProjectStatus};
pub use query::{
    AuditFilter, Page, Paged, ProjectFilter, ProjectSummary, TaskFilter, TenantDetails,
    TenantFilter, TenantStats, TenantSummary, UserFilter, UserProfile,
};
pub use task::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};
pub use tenant::{ResourceKind, SubscriptionPlan, Tenant, TenantPatch, TenantStatus};
pub use user::{NewUser, UserAccount, UserPatch, ValidNewUser};
