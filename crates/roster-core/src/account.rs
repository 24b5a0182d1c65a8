//! Accounts and departments — the identities every decision is made about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An organisational department. Rows are seeded at bootstrap; accounts
/// must reference one at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
  pub id:         Uuid,
  pub name:       String,
  pub created_at: DateTime<Utc>,
}

/// A user account. Role membership lives in the store, not on the struct;
/// callers load it once per request as a [`RoleSet`](crate::role::RoleSet).
///
/// `is_suspended` is the raw stored flag. Whether the account is *currently*
/// suspended is decided by [`suspension::is_currently_suspended`]
/// (crate::suspension::is_currently_suspended) — an expired `suspended_until`
/// means the flag is stale until the next touch normalises it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub id:                Uuid,
  pub name:              String,
  pub email:             String,
  #[serde(skip_serializing)]
  pub password_hash:     String,
  pub department_id:     Option<Uuid>,
  pub is_suspended:      bool,
  pub suspended_until:   Option<DateTime<Utc>>,
  pub suspension_reason: Option<String>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

/// Input for account creation (registration or admin create).
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub name:          String,
  pub email:         String,
  pub password_hash: String,
  pub department_id: Uuid,
}
