//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Enumerations (roles, task
//! status, announcement kind, target scope) are stored by their canonical
//! name. Theme metadata is stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use roster_core::{
  account::{Account, Department},
  broadcast::{Announcement, AnnouncementKind, SystemTheme, TargetScope},
  hierarchy::ManagerEdge,
  task::{Project, Task, TaskStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_opt_dt(dt: Option<DateTime<Utc>>) -> Option<String> {
  dt.map(encode_dt)
}

pub fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

pub struct RawDepartment {
  pub id:         String,
  pub name:       String,
  pub created_at: String,
}

impl RawDepartment {
  pub fn into_department(self) -> Result<Department> {
    Ok(Department {
      id:         decode_uuid(&self.id)?,
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAccount {
  pub id:                String,
  pub name:              String,
  pub email:             String,
  pub password_hash:     String,
  pub department_id:     Option<String>,
  pub is_suspended:      bool,
  pub suspended_until:   Option<String>,
  pub suspension_reason: Option<String>,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawAccount {
  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      id:                decode_uuid(&self.id)?,
      name:              self.name,
      email:             self.email,
      password_hash:     self.password_hash,
      department_id:     decode_opt_uuid(self.department_id.as_deref())?,
      is_suspended:      self.is_suspended,
      suspended_until:   decode_opt_dt(self.suspended_until.as_deref())?,
      suspension_reason: self.suspension_reason,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

/// Shared SELECT column list matching [`RawAccount`]'s field order.
pub const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, \
   department_id, is_suspended, suspended_until, suspension_reason, \
   created_at, updated_at";

pub fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAccount> {
  Ok(RawAccount {
    id:                row.get(0)?,
    name:              row.get(1)?,
    email:             row.get(2)?,
    password_hash:     row.get(3)?,
    department_id:     row.get(4)?,
    is_suspended:      row.get(5)?,
    suspended_until:   row.get(6)?,
    suspension_reason: row.get(7)?,
    created_at:        row.get(8)?,
    updated_at:        row.get(9)?,
  })
}

pub struct RawEdge {
  pub id:             String,
  pub manager_id:     String,
  pub subordinate_id: String,
  pub created_at:     String,
}

impl RawEdge {
  pub fn into_edge(self) -> Result<ManagerEdge> {
    Ok(ManagerEdge {
      id:             decode_uuid(&self.id)?,
      manager_id:     decode_uuid(&self.manager_id)?,
      subordinate_id: decode_uuid(&self.subordinate_id)?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawProject {
  pub id:          String,
  pub name:        String,
  pub description: Option<String>,
  pub user_id:     String,
  pub created_by:  String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawProject {
  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      id:          decode_uuid(&self.id)?,
      name:        self.name,
      description: self.description,
      user_id:     decode_uuid(&self.user_id)?,
      created_by:  decode_uuid(&self.created_by)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const PROJECT_COLUMNS: &str =
  "id, name, description, user_id, created_by, created_at, updated_at";

pub fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawProject> {
  Ok(RawProject {
    id:          row.get(0)?,
    name:        row.get(1)?,
    description: row.get(2)?,
    user_id:     row.get(3)?,
    created_by:  row.get(4)?,
    created_at:  row.get(5)?,
    updated_at:  row.get(6)?,
  })
}

pub struct RawTask {
  pub id:          String,
  pub project_id:  String,
  pub title:       String,
  pub description: Option<String>,
  pub status:      String,
  pub due_date:    Option<String>,
  pub assigned_to: Option<String>,
  pub user_id:     String,
  pub created_by:  String,
  pub updated_by:  String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawTask {
  pub fn into_task(self) -> Result<Task> {
    Ok(Task {
      id:          decode_uuid(&self.id)?,
      project_id:  decode_uuid(&self.project_id)?,
      title:       self.title,
      description: self.description,
      status:      TaskStatus::parse(&self.status).map_err(Error::Core)?,
      due_date:    decode_opt_dt(self.due_date.as_deref())?,
      assigned_to: decode_opt_uuid(self.assigned_to.as_deref())?,
      user_id:     decode_uuid(&self.user_id)?,
      created_by:  decode_uuid(&self.created_by)?,
      updated_by:  decode_uuid(&self.updated_by)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const TASK_COLUMNS: &str = "id, project_id, title, description, status, \
   due_date, assigned_to, user_id, created_by, updated_by, created_at, \
   updated_at";

pub fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTask> {
  Ok(RawTask {
    id:          row.get(0)?,
    project_id:  row.get(1)?,
    title:       row.get(2)?,
    description: row.get(3)?,
    status:      row.get(4)?,
    due_date:    row.get(5)?,
    assigned_to: row.get(6)?,
    user_id:     row.get(7)?,
    created_by:  row.get(8)?,
    updated_by:  row.get(9)?,
    created_at:  row.get(10)?,
    updated_at:  row.get(11)?,
  })
}

pub struct RawAnnouncement {
  pub id:                   String,
  pub title:                String,
  pub message:              String,
  pub kind:                 String,
  pub target_scope:         String,
  pub target_role:          Option<String>,
  pub target_department_id: Option<String>,
  pub is_pinned:            bool,
  pub is_active:            bool,
  pub starts_at:            Option<String>,
  pub ends_at:              Option<String>,
  pub created_by:           String,
  pub created_at:           String,
  pub updated_at:           String,
}

impl RawAnnouncement {
  pub fn into_announcement(self) -> Result<Announcement> {
    Ok(Announcement {
      id:                   decode_uuid(&self.id)?,
      title:                self.title,
      message:              self.message,
      kind:                 AnnouncementKind::parse(&self.kind).map_err(Error::Core)?,
      target_scope:         TargetScope::parse(&self.target_scope).map_err(Error::Core)?,
      target_role:          self.target_role,
      target_department_id: decode_opt_uuid(self.target_department_id.as_deref())?,
      is_pinned:            self.is_pinned,
      is_active:            self.is_active,
      starts_at:            decode_opt_dt(self.starts_at.as_deref())?,
      ends_at:              decode_opt_dt(self.ends_at.as_deref())?,
      created_by:           decode_uuid(&self.created_by)?,
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
    })
  }
}

pub const ANNOUNCEMENT_COLUMNS: &str = "id, title, message, kind, \
   target_scope, target_role, target_department_id, is_pinned, is_active, \
   starts_at, ends_at, created_by, created_at, updated_at";

pub fn announcement_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawAnnouncement> {
  Ok(RawAnnouncement {
    id:                   row.get(0)?,
    title:                row.get(1)?,
    message:              row.get(2)?,
    kind:                 row.get(3)?,
    target_scope:         row.get(4)?,
    target_role:          row.get(5)?,
    target_department_id: row.get(6)?,
    is_pinned:            row.get(7)?,
    is_active:            row.get(8)?,
    starts_at:            row.get(9)?,
    ends_at:              row.get(10)?,
    created_by:           row.get(11)?,
    created_at:           row.get(12)?,
    updated_at:           row.get(13)?,
  })
}

pub struct RawTheme {
  pub id:             String,
  pub name:           String,
  pub tagline:        Option<String>,
  pub banner_message: Option<String>,
  pub primary_color:  String,
  pub accent_color:   String,
  pub surface_color:  String,
  pub is_active:      bool,
  pub starts_at:      Option<String>,
  pub ends_at:        Option<String>,
  pub meta:           Option<String>,
  pub created_by:     String,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawTheme {
  pub fn into_theme(self) -> Result<SystemTheme> {
    Ok(SystemTheme {
      id:             decode_uuid(&self.id)?,
      name:           self.name,
      tagline:        self.tagline,
      banner_message: self.banner_message,
      primary_color:  self.primary_color,
      accent_color:   self.accent_color,
      surface_color:  self.surface_color,
      is_active:      self.is_active,
      starts_at:      decode_opt_dt(self.starts_at.as_deref())?,
      ends_at:        decode_opt_dt(self.ends_at.as_deref())?,
      meta:           self.meta.as_deref().map(serde_json::from_str).transpose()?,
      created_by:     decode_uuid(&self.created_by)?,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

pub const THEME_COLUMNS: &str = "id, name, tagline, banner_message, \
   primary_color, accent_color, surface_color, is_active, starts_at, \
   ends_at, meta, created_by, created_at, updated_at";

pub fn theme_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTheme> {
  Ok(RawTheme {
    id:             row.get(0)?,
    name:           row.get(1)?,
    tagline:        row.get(2)?,
    banner_message: row.get(3)?,
    primary_color:  row.get(4)?,
    accent_color:   row.get(5)?,
    surface_color:  row.get(6)?,
    is_active:      row.get(7)?,
    starts_at:      row.get(8)?,
    ends_at:        row.get(9)?,
    meta:           row.get(10)?,
    created_by:     row.get(11)?,
    created_at:     row.get(12)?,
    updated_at:     row.get(13)?,
  })
}
