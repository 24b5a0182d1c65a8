//! Announcements and system themes — admin broadcasts with active windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::role::RoleSet;

// ─── Announcements ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
  Info,
  Warning,
  Critical,
  Celebration,
}

impl AnnouncementKind {
  pub fn as_str(self) -> &'static str {
    match self {
      AnnouncementKind::Info => "info",
      AnnouncementKind::Warning => "warning",
      AnnouncementKind::Critical => "critical",
      AnnouncementKind::Celebration => "celebration",
    }
  }

  pub fn parse(s: &str) -> crate::Result<AnnouncementKind> {
    match s {
      "info" => Ok(AnnouncementKind::Info),
      "warning" => Ok(AnnouncementKind::Warning),
      "critical" => Ok(AnnouncementKind::Critical),
      "celebration" => Ok(AnnouncementKind::Celebration),
      other => Err(crate::Error::UnknownAnnouncementKind(other.to_string())),
    }
  }
}

/// Who a broadcast is aimed at. The matching target field is required and
/// the others are nulled at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetScope {
  All,
  Role,
  Department,
}

impl TargetScope {
  pub fn as_str(self) -> &'static str {
    match self {
      TargetScope::All => "all",
      TargetScope::Role => "role",
      TargetScope::Department => "department",
    }
  }

  pub fn parse(s: &str) -> crate::Result<TargetScope> {
    match s {
      "all" => Ok(TargetScope::All),
      "role" => Ok(TargetScope::Role),
      "department" => Ok(TargetScope::Department),
      other => Err(crate::Error::UnknownTargetScope(other.to_string())),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
  pub id:                   Uuid,
  pub title:                String,
  pub message:              String,
  #[serde(rename = "type")]
  pub kind:                 AnnouncementKind,
  pub target_scope:         TargetScope,
  pub target_role:          Option<String>,
  pub target_department_id: Option<Uuid>,
  pub is_pinned:            bool,
  pub is_active:            bool,
  pub starts_at:            Option<DateTime<Utc>>,
  pub ends_at:              Option<DateTime<Utc>>,
  pub created_by:           Uuid,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnnouncement {
  pub title:                String,
  pub message:              String,
  pub kind:                 AnnouncementKind,
  pub target_scope:         TargetScope,
  pub target_role:          Option<String>,
  pub target_department_id: Option<Uuid>,
  pub is_pinned:            bool,
  pub is_active:            bool,
  pub starts_at:            Option<DateTime<Utc>>,
  pub ends_at:              Option<DateTime<Utc>>,
  pub created_by:           Uuid,
}

// ─── Themes ──────────────────────────────────────────────────────────────────

/// A system-wide visual theme. At most one theme is active at a time;
/// activation deactivates every other row (last writer wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemTheme {
  pub id:             Uuid,
  pub name:           String,
  pub tagline:        Option<String>,
  pub banner_message: Option<String>,
  pub primary_color:  String,
  pub accent_color:   String,
  pub surface_color:  String,
  pub is_active:      bool,
  pub starts_at:      Option<DateTime<Utc>>,
  pub ends_at:        Option<DateTime<Utc>>,
  pub meta:           Option<Value>,
  pub created_by:     Uuid,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTheme {
  pub name:           String,
  pub tagline:        Option<String>,
  pub banner_message: Option<String>,
  pub primary_color:  String,
  pub accent_color:   String,
  pub surface_color:  String,
  pub is_active:      bool,
  pub starts_at:      Option<DateTime<Utc>>,
  pub ends_at:        Option<DateTime<Utc>>,
  pub meta:           Option<Value>,
  pub created_by:     Uuid,
}

// ─── Active-window predicates ────────────────────────────────────────────────

fn window_contains(
  starts_at: Option<DateTime<Utc>>,
  ends_at:   Option<DateTime<Utc>>,
  now:       DateTime<Utc>,
) -> bool {
  starts_at.is_none_or(|s| s <= now) && ends_at.is_none_or(|e| e >= now)
}

/// Active flag set AND now inside the (open-ended) window.
pub fn announcement_is_active_now(a: &Announcement, now: DateTime<Utc>) -> bool {
  a.is_active && window_contains(a.starts_at, a.ends_at, now)
}

pub fn theme_is_active_now(t: &SystemTheme, now: DateTime<Utc>) -> bool {
  t.is_active && window_contains(t.starts_at, t.ends_at, now)
}

/// Whether a broadcast targets the given viewer.
pub fn announcement_targets(
  a:             &Announcement,
  roles:         &RoleSet,
  department_id: Option<Uuid>,
) -> bool {
  match a.target_scope {
    TargetScope::All => true,
    TargetScope::Role => a
      .target_role
      .as_deref()
      .is_some_and(|name| roles.iter().any(|r| r.as_str() == name)),
    TargetScope::Department => {
      a.target_department_id.is_some() && a.target_department_id == department_id
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::role::Role;

  fn announcement(scope: TargetScope) -> Announcement {
    let now = Utc::now();
    Announcement {
      id:                   Uuid::new_v4(),
      title:                "t".into(),
      message:              "m".into(),
      kind:                 AnnouncementKind::Info,
      target_scope:         scope,
      target_role:          None,
      target_department_id: None,
      is_pinned:            false,
      is_active:            true,
      starts_at:            None,
      ends_at:              None,
      created_by:           Uuid::new_v4(),
      created_at:           now,
      updated_at:           now,
    }
  }

  #[test]
  fn open_ended_window_is_active() {
    let now = Utc::now();
    assert!(announcement_is_active_now(&announcement(TargetScope::All), now));
  }

  #[test]
  fn window_bounds_are_inclusive_of_now() {
    let now = Utc::now();
    let mut a = announcement(TargetScope::All);
    a.starts_at = Some(now - Duration::hours(1));
    a.ends_at = Some(now - Duration::minutes(1));
    assert!(!announcement_is_active_now(&a, now));

    a.ends_at = Some(now + Duration::minutes(1));
    assert!(announcement_is_active_now(&a, now));

    a.is_active = false;
    assert!(!announcement_is_active_now(&a, now));
  }

  #[test]
  fn role_scope_matches_viewer_roles() {
    let mut a = announcement(TargetScope::Role);
    a.target_role = Some("chef".into());

    let chef = RoleSet::new(vec![Role::User, Role::Chef]);
    let staff = RoleSet::new(vec![Role::User, Role::Staff]);
    assert!(announcement_targets(&a, &chef, None));
    assert!(!announcement_targets(&a, &staff, None));
  }

  #[test]
  fn department_scope_requires_matching_department() {
    let dept = Uuid::new_v4();
    let mut a = announcement(TargetScope::Department);
    a.target_department_id = Some(dept);

    let roles = RoleSet::new(vec![Role::User]);
    assert!(announcement_targets(&a, &roles, Some(dept)));
    assert!(!announcement_targets(&a, &roles, Some(Uuid::new_v4())));
    assert!(!announcement_targets(&a, &roles, None));
  }
}
