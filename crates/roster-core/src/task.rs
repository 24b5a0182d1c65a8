//! Tasks, projects, and the ownership relations the authorization core
//! reasons over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the lazily created per-account default project.
pub const PERSONAL_WORKSPACE: &str = "Personal Workspace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  Pending,
  InProgress,
  Completed,
}

impl TaskStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      TaskStatus::Pending => "pending",
      TaskStatus::InProgress => "in_progress",
      TaskStatus::Completed => "completed",
    }
  }

  pub fn parse(s: &str) -> crate::Result<TaskStatus> {
    match s {
      "pending" => Ok(TaskStatus::Pending),
      "in_progress" => Ok(TaskStatus::InProgress),
      "completed" => Ok(TaskStatus::Completed),
      other => Err(crate::Error::UnknownTaskStatus(other.to_string())),
    }
  }
}

/// A task container. `user_id` names the owning account alongside the
/// `created_by` audit field; both grant access to the project's tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
  pub id:          Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub user_id:     Uuid,
  pub created_by:  Uuid,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
  pub id:          Uuid,
  pub project_id:  Uuid,
  pub title:       String,
  pub description: Option<String>,
  pub status:      TaskStatus,
  pub due_date:    Option<DateTime<Utc>>,
  pub assigned_to: Option<Uuid>,
  pub user_id:     Uuid,
  pub created_by:  Uuid,
  pub updated_by:  Uuid,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input for task creation; audit fields are derived from the actor.
#[derive(Debug, Clone)]
pub struct NewTask {
  pub project_id:  Uuid,
  pub title:       String,
  pub description: Option<String>,
  pub status:      TaskStatus,
  pub due_date:    Option<DateTime<Utc>>,
  pub assigned_to: Option<Uuid>,
  pub actor_id:    Uuid,
}

/// Partial update for a task. `None` means "leave unchanged"; the nested
/// options distinguish "set to null" from "absent".
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
  pub project_id:  Option<Uuid>,
  pub title:       Option<String>,
  pub description: Option<Option<String>>,
  pub status:      Option<TaskStatus>,
  pub due_date:    Option<Option<DateTime<Utc>>>,
  pub assigned_to: Option<Option<Uuid>>,
  pub actor_id:    Uuid,
}
