//! Task CRUD: listing, creation, update, and deletion, all gated by the
//! task-access and assignee-resolution rules.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use roster_core::{
  authz::{self, Actor, AssigneeCandidate},
  store::{DirectoryStore, TaskQuery},
  suspension,
  task::{NewTask, Project, TaskPatch, TaskStatus},
};

use crate::{
  AppState,
  auth::CurrentUser,
  error::{ApiError, FieldErrors},
  present,
  validate,
};

pub const DEFAULT_PER_PAGE: u32 = 15;

// ─── Listing ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
  pub status:      Option<String>,
  pub project_id:  Option<Uuid>,
  pub assigned_to: Option<Uuid>,
  pub page:        Option<u32>,
  pub per_page:    Option<u32>,
}

/// `GET /tasks` — newest first, paginated. Non-admins only see tasks they
/// created, are assigned, or that live in a project they own or created.
pub async fn index<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Query(query): Query<TaskListQuery>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let mut errors = FieldErrors::new();
  let status = match query.status.as_deref() {
    Some(s) => match TaskStatus::parse(s) {
      Ok(status) => Some(status),
      Err(_) => {
        errors.push("status", "The selected status is invalid.");
        None
      }
    },
    None => None,
  };
  let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
  if !(1..=100).contains(&per_page) {
    errors.push("per_page", "The per_page must be between 1 and 100.");
  }
  errors.into_result()?;

  let actor = user.actor();
  let page = state
    .store
    .list_tasks(TaskQuery {
      viewer: (!actor.is_admin()).then_some(actor.id),
      status,
      project_id: query.project_id,
      assigned_to: query.assigned_to,
      page: query.page.unwrap_or(1).max(1),
      per_page,
    })
    .await?;

  let data = present::task_views(&*state.store, page.tasks).await?;
  Ok(Json(json!({
    "data": data,
    "page": page.page,
    "per_page": page.per_page,
    "total": page.total,
  })))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTaskBody {
  pub project_id:  Option<Uuid>,
  pub title:       Option<String>,
  pub description: Option<String>,
  pub status:      Option<String>,
  pub due_date:    Option<DateTime<Utc>>,
  pub assigned_to: Option<Uuid>,
}

/// `POST /tasks` — the project defaults to the caller's personal
/// workspace and the assignee is resolved per the caller's role.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<CreateTaskBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let mut errors = FieldErrors::new();
  let title = validate::require(&mut errors, "title", body.title.as_deref());
  if let Some(title) = title {
    validate::max_len(&mut errors, "title", title, 255);
  }
  let status = match body.status.as_deref() {
    Some(s) => match TaskStatus::parse(s) {
      Ok(status) => status,
      Err(_) => {
        errors.push("status", "The selected status is invalid.");
        TaskStatus::Pending
      }
    },
    None => TaskStatus::Pending,
  };
  errors.into_result()?;
  let title = title.unwrap_or_default().to_string();

  let actor = user.actor();
  let project = resolve_project(&state, &actor, body.project_id).await?;
  let assigned_to = resolve_assignee(&state, &actor, body.assigned_to).await?;

  let task = state
    .store
    .create_task(NewTask {
      project_id: project.id,
      title,
      description: body.description,
      status,
      due_date: body.due_date,
      assigned_to,
      actor_id: actor.id,
    })
    .await?;

  let view = present::task_view(&*state.store, task).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /tasks/{id}`
pub async fn show<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let (task, _) = load_accessible_task(&state, &user.actor(), id).await?;
  Ok(Json(present::task_view(&*state.store, task).await?))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// Nested options distinguish "field absent" (outer `None`) from "set to
/// null" (inner `None`); serde's default covers the absent case.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskBody {
  #[serde(default)]
  pub project_id:  Option<Option<Uuid>>,
  pub title:       Option<String>,
  #[serde(default)]
  pub description: Option<Option<String>>,
  pub status:      Option<String>,
  #[serde(default)]
  pub due_date:    Option<Option<DateTime<Utc>>>,
  #[serde(default)]
  pub assigned_to: Option<Option<Uuid>>,
}

/// `PATCH /tasks/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateTaskBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let actor = user.actor();
  load_accessible_task(&state, &actor, id).await?;

  let mut errors = FieldErrors::new();
  if let Some(title) = body.title.as_deref() {
    if title.trim().is_empty() {
      errors.push("title", "The title field is required.");
    }
    validate::max_len(&mut errors, "title", title, 255);
  }
  let status = match body.status.as_deref() {
    Some(s) => match TaskStatus::parse(s) {
      Ok(status) => Some(status),
      Err(_) => {
        errors.push("status", "The selected status is invalid.");
        None
      }
    },
    None => None,
  };
  errors.into_result()?;

  // A present-but-null project re-targets the personal workspace.
  let project_id = match body.project_id {
    Some(requested) => {
      Some(resolve_project(&state, &actor, requested).await?.id)
    }
    None => None,
  };
  let assigned_to = match body.assigned_to {
    Some(requested) => Some(resolve_assignee(&state, &actor, requested).await?),
    None => None,
  };

  let task = state
    .store
    .update_task(id, TaskPatch {
      project_id,
      title: body.title,
      description: body.description,
      status,
      due_date: body.due_date,
      assigned_to,
      actor_id: actor.id,
    })
    .await?;

  Ok(Json(present::task_view(&*state.store, task).await?))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /tasks/{id}` — records the deleting account before the row goes.
pub async fn destroy<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let actor = user.actor();
  load_accessible_task(&state, &actor, id).await?;

  state.store.delete_task(id, actor.id).await?;
  Ok(Json(json!({ "message": "Task deleted successfully" })))
}

// ─── Shared resolution helpers ───────────────────────────────────────────────

async fn load_accessible_task<S>(
  state: &AppState<S>,
  actor: &Actor,
  id:    Uuid,
) -> Result<(roster_core::task::Task, Option<Project>), ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let task = state
    .store
    .get_task(id)
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found.".to_string()))?;
  let project = state.store.get_project(task.project_id).await?;

  if !authz::can_access_task(actor, &task, project.as_ref()) {
    return Err(ApiError::Forbidden("Forbidden".to_string()));
  }
  Ok((task, project))
}

/// Explicit id → must exist and be accessible; absent → the caller's
/// personal workspace, created on first use.
async fn resolve_project<S>(
  state:     &AppState<S>,
  actor:     &Actor,
  requested: Option<Uuid>,
) -> Result<Project, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  match requested {
    Some(id) => {
      let project = state.store.get_project(id).await?.ok_or_else(|| {
        ApiError::validation("project_id", "The selected project_id is invalid.")
      })?;
      if !authz::can_access_project(actor, &project) {
        return Err(ApiError::Forbidden("Forbidden".to_string()));
      }
      Ok(project)
    }
    None => Ok(state.store.personal_workspace(actor.id).await?),
  }
}

/// Gather the candidate facts and run [`authz::resolve_assignee`].
async fn resolve_assignee<S>(
  state:     &AppState<S>,
  actor:     &Actor,
  requested: Option<Uuid>,
) -> Result<Option<Uuid>, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let candidate = match requested {
    Some(id) => match state.store.get_account(id).await? {
      Some(account) => {
        let roles = state.store.roles_of(account.id).await?;
        let mapped = actor.is_manager()
          && state.store.edge_exists(actor.id, account.id).await?;
        Some(AssigneeCandidate {
          id: account.id,
          roles,
          currently_suspended: suspension::is_currently_suspended(
            &account,
            Utc::now(),
          ),
          mapped_to_actor: mapped,
        })
      }
      None => None,
    },
    None => None,
  };

  Ok(authz::resolve_assignee(actor, requested, candidate.as_ref())?)
}
