use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use workhive_core::{AuditEntryId, TenantId, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    TenantRegistration,
    Login,
    Logout,
    UpdateTenant,
    UpdateTenantSubscription,
    CreateUser,
    UpdateUser,
    DeleteUser,
    CreateProject,
    UpdateProject,
    DeleteProject,
    CreateTask,
    UpdateTask,
    UpdateTaskStatus,
    DeleteTask,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        use AuditAction::*;
        match self {
            TenantRegistration => "TENANT_REGISTRATION",
            Login => "LOGIN",
            Logout => "LOGOUT",
            UpdateTenant => "UPDATE_TENANT",
            UpdateTenantSubscription => "UPDATE_TENANT_SUBSCRIPTION",
            CreateUser => "CREATE_USER",
            UpdateUser => "UPDATE_USER",
            DeleteUser => "DELETE_USER",
            CreateProject => "CREATE_PROJECT",
            UpdateProject => "UPDATE_PROJECT",
            DeleteProject => "DELETE_PROJECT",
            CreateTask => "CREATE_TASK",
            UpdateTask => "UPDATE_TASK",
            UpdateTaskStatus => "UPDATE_TASK_STATUS",
            DeleteTask => "DELETE_TASK",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        use AuditAction::*;
        Some(match s {
            "TENANT_REGISTRATION" => TenantRegistration,
            "LOGIN" => Login,
            "LOGOUT" => Logout,
            "UPDATE_TENANT" => UpdateTenant,
            "UPDATE_TENANT_SUBSCRIPTION" => UpdateTenantSubscription,
            "CREATE_USER" => CreateUser,
            "UPDATE_USER" => UpdateUser,
            "DELETE_USER" => DeleteUser,
            "CREATE_PROJECT" => CreateProject,
            "UPDATE_PROJECT" => UpdateProject,
            "DELETE_PROJECT" => DeleteProject,
            "CREATE_TASK" => CreateTask,
            "UPDATE_TASK" => UpdateTask,
            "UPDATE_TASK_STATUS" => UpdateTaskStatus,
            "DELETE_TASK" => DeleteTask,
            _ => return None,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Tenant,
    User,
    Project,
    Task,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Tenant => "tenant",
            EntityType::User => "user",
            EntityType::Project => "project",
            EntityType::Task => "task",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tenant" => Some(Self::Tenant),
            "user" => Some(Self::User),
            "project" => Some(Self::Project),
            "task" => Some(Self::Task),
            _ => None,
        }
    }
}

/// Immutable record of one successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub tenant_id: Option<TenantId>,
    pub actor_user_id: UserId,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        tenant_id: Option<TenantId>,
        actor_user_id: UserId,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: impl Into<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            tenant_id,
            actor_user_id,
            action,
            entity_type,
            entity_id: entity_id.into(),
            created_at: now,
        }
    }
}
