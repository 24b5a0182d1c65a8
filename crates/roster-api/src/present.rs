//! Response view assembly — entities joined with the related records the
//! clients render (roles, departments, projects, assignees, creators).

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use roster_core::{
  Result as CoreResult,
  account::{Account, Department},
  broadcast::{Announcement, SystemTheme},
  hierarchy::ManagerEdge,
  store::DirectoryStore,
  suspension,
  task::{Project, Task},
};

// ─── Accounts ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AccountView {
  pub id:                     Uuid,
  pub name:                   String,
  pub email:                  String,
  pub department_id:          Option<Uuid>,
  pub department:             Option<Department>,
  pub roles:                  Vec<&'static str>,
  pub is_suspended:           bool,
  pub is_currently_suspended: bool,
  pub suspended_until:        Option<chrono::DateTime<Utc>>,
  pub suspension_reason:      Option<String>,
  pub created_at:             chrono::DateTime<Utc>,
  pub updated_at:             chrono::DateTime<Utc>,
}

pub fn account_view_from_parts(
  account:    Account,
  roles:      &roster_core::role::RoleSet,
  department: Option<Department>,
) -> AccountView {
  let now = Utc::now();
  let is_currently_suspended = suspension::is_currently_suspended(&account, now);
  AccountView {
    id:                     account.id,
    name:                   account.name,
    email:                  account.email,
    department_id:          account.department_id,
    department,
    roles:                  roles.iter().map(|r| r.as_str()).collect(),
    is_currently_suspended,
    is_suspended:           account.is_suspended,
    suspended_until:        account.suspended_until,
    suspension_reason:      account.suspension_reason,
    created_at:             account.created_at,
    updated_at:             account.updated_at,
  }
}

pub async fn account_view<S: DirectoryStore>(
  store:   &S,
  account: Account,
) -> CoreResult<AccountView> {
  let roles = store.roles_of(account.id).await?;
  let department = match account.department_id {
    Some(id) => store.get_department(id).await?,
    None => None,
  };
  Ok(account_view_from_parts(account, &roles, department))
}

pub async fn account_views<S: DirectoryStore>(
  store:    &S,
  accounts: Vec<Account>,
) -> CoreResult<Vec<AccountView>> {
  let mut views = Vec::with_capacity(accounts.len());
  for account in accounts {
    views.push(account_view(store, account).await?);
  }
  Ok(views)
}

/// Slim creator reference embedded in broadcast views.
#[derive(Debug, Serialize)]
pub struct AccountSummary {
  pub id:    Uuid,
  pub name:  String,
  pub email: String,
}

async fn account_summary<S: DirectoryStore>(
  store: &S,
  id:    Uuid,
) -> CoreResult<Option<AccountSummary>> {
  Ok(store.get_account(id).await?.map(|a| AccountSummary {
    id:    a.id,
    name:  a.name,
    email: a.email,
  }))
}

// ─── Tasks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TaskView {
  #[serde(flatten)]
  pub task:     Task,
  pub project:  Option<Project>,
  pub assignee: Option<AccountView>,
}

pub async fn task_view<S: DirectoryStore>(
  store: &S,
  task:  Task,
) -> CoreResult<TaskView> {
  let project = store.get_project(task.project_id).await?;
  let assignee = match task.assigned_to {
    Some(id) => match store.get_account(id).await? {
      Some(account) => Some(account_view(store, account).await?),
      None => None,
    },
    None => None,
  };
  Ok(TaskView { task, project, assignee })
}

pub async fn task_views<S: DirectoryStore>(
  store: &S,
  tasks: Vec<Task>,
) -> CoreResult<Vec<TaskView>> {
  let mut views = Vec::with_capacity(tasks.len());
  for task in tasks {
    views.push(task_view(store, task).await?);
  }
  Ok(views)
}

// ─── Hierarchy ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct EdgeView {
  #[serde(flatten)]
  pub edge:        ManagerEdge,
  pub manager:     Option<AccountView>,
  pub subordinate: Option<AccountView>,
}

pub async fn edge_view<S: DirectoryStore>(
  store: &S,
  edge:  ManagerEdge,
) -> CoreResult<EdgeView> {
  let manager = match store.get_account(edge.manager_id).await? {
    Some(account) => Some(account_view(store, account).await?),
    None => None,
  };
  let subordinate = match store.get_account(edge.subordinate_id).await? {
    Some(account) => Some(account_view(store, account).await?),
    None => None,
  };
  Ok(EdgeView { edge, manager, subordinate })
}

// ─── Broadcasts ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AnnouncementView {
  #[serde(flatten)]
  pub announcement: Announcement,
  pub creator:      Option<AccountSummary>,
  pub department:   Option<Department>,
}

pub async fn announcement_view<S: DirectoryStore>(
  store:        &S,
  announcement: Announcement,
) -> CoreResult<AnnouncementView> {
  let creator = account_summary(store, announcement.created_by).await?;
  let department = match announcement.target_department_id {
    Some(id) => store.get_department(id).await?,
    None => None,
  };
  Ok(AnnouncementView { announcement, creator, department })
}

pub async fn announcement_views<S: DirectoryStore>(
  store:         &S,
  announcements: Vec<Announcement>,
) -> CoreResult<Vec<AnnouncementView>> {
  let mut views = Vec::with_capacity(announcements.len());
  for announcement in announcements {
    views.push(announcement_view(store, announcement).await?);
  }
  Ok(views)
}

#[derive(Debug, Serialize)]
pub struct ThemeView {
  #[serde(flatten)]
  pub theme:   SystemTheme,
  pub creator: Option<AccountSummary>,
}

pub async fn theme_view<S: DirectoryStore>(
  store: &S,
  theme: SystemTheme,
) -> CoreResult<ThemeView> {
  let creator = account_summary(store, theme.created_by).await?;
  Ok(ThemeView { theme, creator })
}

pub async fn theme_views<S: DirectoryStore>(
  store:  &S,
  themes: Vec<SystemTheme>,
) -> CoreResult<Vec<ThemeView>> {
  let mut views = Vec::with_capacity(themes.len());
  for theme in themes {
    views.push(theme_view(store, theme).await?);
  }
  Ok(views)
}
