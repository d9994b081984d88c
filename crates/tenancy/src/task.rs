use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use workhive_core::{DomainError, DomainResult, ProjectId, TaskId, TenantId, UserId};

use crate::project::Project;
use crate::validate::{optional_text, required_text};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(DomainError::validation("status must be one of: todo, in_progress, completed")),
        }
    }
}

/// Ordered low < medium < high.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(DomainError::validation("priority must be one of: low, medium, high")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    /// Always the parent project's tenant.
    pub tenant_id: TenantId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<UserId>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    /// Materialize under `project`; the tenant is inherited, never supplied.
    pub fn into_task(self, project: &Project, now: DateTime<Utc>) -> DomainResult<Task> {
        Ok(Task {
            id: TaskId::new(),
            project_id: project.id,
            tenant_id: project.tenant_id,
            title: required_text("title", &self.title)?,
            description: optional_text(self.description),
            status: TaskStatus::Todo,
            priority: self.priority.unwrap_or(TaskPriority::Medium),
            assigned_to: self.assigned_to,
            due_date: self.due_date,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Full task edit. Double options distinguish "leave" from "clear".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Option<UserId>>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.due_date.is_none()
    }

    /// The assignee this patch introduces, if any.
    pub fn new_assignee(&self) -> Option<UserId> {
        self.assigned_to.flatten()
    }

    pub fn validated(mut self) -> DomainResult<Self> {
        if self.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        if let Some(title) = self.title.take() {
            self.title = Some(required_text("title", &title)?);
        }
        self.description = self.description.map(optional_text);
        Ok(self)
    }

    pub fn apply(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assignee) = self.assigned_to {
            task.assigned_to = assignee;
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        task.updated_at = now;
    }
}
