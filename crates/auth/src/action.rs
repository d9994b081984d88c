use serde::Serialize;

/// How much of a user record a patch touches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserPatchScope {
    /// Only `fullName`.
    ProfileOnly,
    /// `role` and/or `isActive`, possibly with `fullName`.
    Privileged,
}

/// Every operation the authorization engine can be asked about.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ReadTenant,
    ListTenants,
    UpdateTenant,
    AdministerSubscription,

    ReadUser,
    ListUsers,
    CreateUser,
    UpdateUser(UserPatchScope),
    DeleteUser,

    ReadProject,
    ListProjects,
    CreateProject,
    UpdateProject,
    DeleteProject,

    ReadTask,
    ListTasks,
    CreateTask,
    UpdateTask,
    UpdateTaskStatus,
    DeleteTask,

    ReadAuditLog,
}

/// Coarse classification used by role policies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Read,
    Mutate,
    /// Tenant subscription administration (status, plan, limits).
    Administer,
}

impl Action {
    /// The single classification table.
    pub fn kind(&self) -> ActionKind {
        use Action::*;
        match self {
            ReadTenant | ListTenants | ReadUser | ListUsers | ReadProject | ListProjects
            | ReadTask | ListTasks | ReadAuditLog => ActionKind::Read,

            UpdateTenant | CreateUser | UpdateUser(_) | DeleteUser | CreateProject
            | UpdateProject | DeleteProject | CreateTask | UpdateTask | UpdateTaskStatus
            | DeleteTask => ActionKind::Mutate,

            AdministerSubscription => ActionKind::Administer,
        }
    }

    /// Actions that span tenants and therefore have no tenant-bound form.
    pub fn is_platform_wide(&self) -> bool {
        matches!(self, Action::ListTenants)
    }

    pub const ALL: [Action; 22] = [
        Action::ReadTenant,
        Action::ListTenants,
        Action::UpdateTenant,
        Action::AdministerSubscription,
        Action::ReadUser,
        Action::ListUsers,
        Action::CreateUser,
        Action::UpdateUser(UserPatchScope::ProfileOnly),
        Action::UpdateUser(UserPatchScope::Privileged),
        Action::DeleteUser,
        Action::ReadProject,
        Action::ListProjects,
        Action::CreateProject,
        Action::UpdateProject,
        Action::DeleteProject,
        Action::ReadTask,
        Action::ListTasks,
        Action::CreateTask,
        Action::UpdateTask,
        Action::UpdateTaskStatus,
        Action::DeleteTask,
        Action::ReadAuditLog,
    ];
}
