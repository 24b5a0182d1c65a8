//! The manager → subordinate delegation graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directed delegation edge. Unique per (manager, subordinate) pair;
/// removed automatically when either endpoint account is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerEdge {
  pub id:             Uuid,
  pub manager_id:     Uuid,
  pub subordinate_id: Uuid,
  pub created_at:     DateTime<Utc>,
}
