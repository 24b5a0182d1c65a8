//! The fixed managed role set and role-derivation rules.
//!
//! Roles are a closed enumeration; membership is loaded once per request
//! and every downstream decision works against the in-memory set.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A role name from the managed set.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Manager,
  Staff,
  Watchman,
  Chef,
  User,
}

/// Every role the system manages, in display order.
pub const MANAGED_ROLES: [Role; 6] = [
  Role::Admin,
  Role::Manager,
  Role::Staff,
  Role::Watchman,
  Role::Chef,
  Role::User,
];

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Role::Admin => "admin",
      Role::Manager => "manager",
      Role::Staff => "staff",
      Role::Watchman => "watchman",
      Role::Chef => "chef",
      Role::User => "user",
    }
  }

  pub fn parse(s: &str) -> Result<Role> {
    match s {
      "admin" => Ok(Role::Admin),
      "manager" => Ok(Role::Manager),
      "staff" => Ok(Role::Staff),
      "watchman" => Ok(Role::Watchman),
      "chef" => Ok(Role::Chef),
      "user" => Ok(Role::User),
      other => Err(Error::UnknownRole(other.to_string())),
    }
  }
}

// ─── RoleSet ─────────────────────────────────────────────────────────────────

/// An account's effective roles, sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
  pub fn new(mut roles: Vec<Role>) -> Self {
    roles.sort();
    roles.dedup();
    Self(roles)
  }

  pub fn has(&self, role: Role) -> bool { self.0.contains(&role) }

  pub fn has_any(&self, roles: &[Role]) -> bool {
    roles.iter().any(|r| self.has(*r))
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
    self.0.iter().copied()
  }

  /// Neither `admin` nor `manager` — eligible as a delegation target.
  pub fn is_assignable_staff(&self) -> bool {
    !self.has_any(&[Role::Admin, Role::Manager])
  }
}

impl FromIterator<Role> for RoleSet {
  fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
    Self::new(iter.into_iter().collect())
  }
}

// ─── Derivation rules ────────────────────────────────────────────────────────

/// Roles granted at registration: `user` plus a department-derived role.
/// Department matching is case-insensitive on the name.
pub fn registration_roles(department_name: &str) -> Vec<Role> {
  let derived = match department_name.to_lowercase().as_str() {
    "management" => Some(Role::Manager),
    "security" => Some(Role::Watchman),
    "kitchen" => Some(Role::Chef),
    "staff" => Some(Role::Staff),
    _ => None,
  };

  let mut roles = vec![Role::User];
  roles.extend(derived);
  roles
}

/// The full role set implied by an admin-chosen primary role.
/// `admin` stands alone; everything else keeps the base `user` role.
pub fn primary_role_sync(primary: Role) -> Vec<Role> {
  match primary {
    Role::Admin => vec![Role::Admin],
    Role::User => vec![Role::User],
    other => vec![Role::User, other],
  }
}
