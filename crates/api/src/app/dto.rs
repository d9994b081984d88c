use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use workhive_auth::Role;
use workhive_core::UserId;
use workhive_infra::services::{LoginRequest, RegisterTenant};
use workhive_tenancy::{
    AuditAction, AuditFilter, EntityType, NewProject, NewTask, NewUser, Page, ProjectFilter,
    ProjectPatch, ProjectStatus, SubscriptionPlan, TaskFilter, TaskPatch, TaskPriority, TaskStatus,
    TenantFilter, TenantPatch, TenantStatus, UserFilter, UserPatch,
};

/// Keeps an explicit `null` apart from an absent field.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

// -------------------------
// Auth
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTenantRequest {
    pub tenant_name: String,
    pub subdomain: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_full_name: String,
}

impl From<RegisterTenantRequest> for RegisterTenant {
    fn from(r: RegisterTenantRequest) -> Self {
        RegisterTenant {
            tenant_name: r.tenant_name,
            subdomain: r.subdomain,
            admin_email: r.admin_email,
            admin_password: r.admin_password,
            admin_full_name: r.admin_full_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
    pub subdomain: Option<String>,
}

impl From<LoginBody> for LoginRequest {
    fn from(b: LoginBody) -> Self {
        LoginRequest { email: b.email, password: b.password, subdomain: b.subdomain }
    }
}

// -------------------------
// Tenants
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantRequest {
    pub name: Option<String>,
    pub status: Option<TenantStatus>,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub max_users: Option<u32>,
    pub max_projects: Option<u32>,
}

impl From<UpdateTenantRequest> for TenantPatch {
    fn from(r: UpdateTenantRequest) -> Self {
        TenantPatch {
            name: r.name,
            status: r.status,
            subscription_plan: r.subscription_plan,
            max_users: r.max_users,
            max_projects: r.max_projects,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<TenantStatus>,
    pub subscription_plan: Option<SubscriptionPlan>,
}

impl TenantListQuery {
    pub fn split(self) -> (TenantFilter, Page) {
        (
            TenantFilter { status: self.status, subscription_plan: self.subscription_plan },
            Page::new(self.page, self.limit, 10),
        )
    }
}

// -------------------------
// Users
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Option<Role>,
}

impl From<CreateUserRequest> for NewUser {
    fn from(r: CreateUserRequest) -> Self {
        NewUser { email: r.email, password: r.password, full_name: r.full_name, role: r.role }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(r: UpdateUserRequest) -> Self {
        UserPatch { full_name: r.full_name, role: r.role, is_active: r.is_active }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<Role>,
}

impl UserListQuery {
    pub fn split(self) -> (UserFilter, Page) {
        (
            UserFilter { search: self.search, role: self.role },
            Page::new(self.page, self.limit, 50),
        )
    }
}

// -------------------------
// Projects
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}

impl From<CreateProjectRequest> for NewProject {
    fn from(r: CreateProjectRequest) -> Self {
        NewProject { name: r.name, description: r.description, status: r.status }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
}

impl From<UpdateProjectRequest> for ProjectPatch {
    fn from(r: UpdateProjectRequest) -> Self {
        ProjectPatch { name: r.name, description: r.description, status: r.status }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<ProjectStatus>,
    pub search: Option<String>,
}

impl ProjectListQuery {
    pub fn split(self) -> (ProjectFilter, Page) {
        (
            ProjectFilter { status: self.status, search: self.search },
            Page::new(self.page, self.limit, 20),
        )
    }
}

// -------------------------
// Tasks
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<UserId>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(r: CreateTaskRequest) -> Self {
        NewTask {
            title: r.title,
            description: r.description,
            assigned_to: r.assigned_to,
            priority: r.priority,
            due_date: r.due_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<UserId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl From<UpdateTaskRequest> for TaskPatch {
    fn from(r: UpdateTaskRequest) -> Self {
        TaskPatch {
            title: r.title,
            description: r.description,
            status: r.status,
            priority: r.priority,
            assigned_to: r.assigned_to,
            due_date: r.due_date,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<UserId>,
    pub priority: Option<TaskPriority>,
    pub search: Option<String>,
}

impl TaskListQuery {
    pub fn split(self) -> (TaskFilter, Page) {
        (
            TaskFilter {
                status: self.status,
                assigned_to: self.assigned_to,
                priority: self.priority,
                search: self.search,
            },
            Page::new(self.page, self.limit, 50),
        )
    }
}

// -------------------------
// Audit
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<EntityType>,
    pub user_id: Option<UserId>,
}

impl AuditListQuery {
    pub fn split(self) -> (AuditFilter, Page) {
        (
            AuditFilter {
                action: self.action,
                entity_type: self.entity_type,
                actor_user_id: self.user_id,
            },
            Page::new(self.page, self.limit, 50),
        )
    }
}
