//! Listing filters, pagination and read-side summaries.

use serde::Serialize;

use workhive_auth::Role;
use workhive_core::UserId;

use crate::audit::{AuditAction, AuditLogEntry, EntityType};
use crate::project::{Project, ProjectStatus};
use crate::task::{TaskPriority, TaskStatus};
use crate::tenant::{SubscriptionPlan, Tenant, TenantStatus};
use crate::user::UserAccount;

pub const MAX_PAGE_SIZE: u32 = 100;

/// 1-based page request with a clamped size.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }

    /// Slice an already-ordered collection.
    pub fn slice<T>(&self, items: Vec<T>) -> Paged<T> {
        let total = items.len() as u64;
        let items = items.into_iter().skip(self.offset()).take(self.limit as usize).collect();
        Paged { items, total, page: self.page, limit: self.limit }
    }
}

/// One page of results. Serializes with a derived `totalPages`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Paged<T> {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.limit as u64)
    }

}

impl<T: Serialize> Serialize for Paged<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a, T> {
            items: &'a [T],
            total: u64,
            page: u32,
            limit: u32,
            total_pages: u64,
        }

        Wire {
            items: &self.items,
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages(),
        }
        .serialize(serializer)
    }
}

/// Case-insensitive substring match used by the in-memory store.
pub fn matches_search(needle: &Option<String>, haystacks: &[&str]) -> bool {
    match needle {
        None => true,
        Some(n) => {
            let n = n.to_lowercase();
            haystacks.iter().any(|h| h.to_lowercase().contains(&n))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
    pub subscription_plan: Option<SubscriptionPlan>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Matches email or full name.
    pub search: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    /// Matches name or description.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<UserId>,
    pub priority: Option<TaskPriority>,
    /// Matches title or description.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub entity_type: Option<EntityType>,
    pub actor_user_id: Option<UserId>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.action.is_none_or(|a| a == entry.action)
            && self.entity_type.is_none_or(|e| e == entry.entity_type)
            && self.actor_user_id.is_none_or(|u| u == entry.actor_user_id)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantStats {
    pub total_users: u64,
    pub total_projects: u64,
    pub total_tasks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDetails {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub stats: TenantStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub total_users: u64,
    pub total_projects: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub task_count: u64,
    pub completed_task_count: u64,
}

/// User record together with the tenant it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: UserAccount,
    pub tenant: Option<Tenant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_and_defaults() {
        assert_eq!(Page::new(None, None, 20), Page { page: 1, limit: 20 });
        assert_eq!(Page::new(Some(0), Some(500), 20), Page { page: 1, limit: 100 });
        assert_eq!(Page::new(Some(3), Some(0), 20), Page { page: 3, limit: 1 });
    }

    #[test]
    fn slice_reports_total_and_pages() {
        let p = Page::new(Some(2), Some(2), 10).slice((1..=5).collect::<Vec<_>>());
        assert_eq!(p.items, vec![3, 4]);
        assert_eq!(p.total, 5);
        assert_eq!(p.total_pages(), 3);
    }

    #[test]
    fn serialized_pages_carry_total_pages() {
        let p = Page::new(Some(1), Some(2), 10).slice(vec!["a", "b", "c"]);
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["items"], serde_json::json!(["a", "b"]));
        assert_eq!(v["total"], 3);
        assert_eq!(v["totalPages"], 2);

        let empty = Page::new(None, None, 10).slice(Vec::<u8>::new());
        assert_eq!(serde_json::to_value(&empty).unwrap()["totalPages"], 0);
    }

    #[test]
    fn search_is_case_insensitive() {
        assert!(matches_search(&Some("ACME".into()), &["the acme corp"]));
        assert!(!matches_search(&Some("zzz".into()), &["a", "b"]));
        assert!(matches_search(&None, &[]));
    }
}
