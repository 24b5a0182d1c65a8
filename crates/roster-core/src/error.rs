//! Error types for `roster-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("account not found: {0}")]
  AccountNotFound(Uuid),

  #[error("department not found: {0}")]
  DepartmentNotFound(Uuid),

  #[error("project not found: {0}")]
  ProjectNotFound(Uuid),

  #[error("task not found: {0}")]
  TaskNotFound(Uuid),

  #[error("announcement not found: {0}")]
  AnnouncementNotFound(Uuid),

  #[error("theme not found: {0}")]
  ThemeNotFound(Uuid),

  #[error("account name already taken: {0:?}")]
  NameTaken(String),

  #[error("account email already taken: {0:?}")]
  EmailTaken(String),

  /// The mutation would leave the system without an active admin.
  #[error("at least one active admin must remain")]
  LastActiveAdmin,

  #[error("unknown role name: {0:?}")]
  UnknownRole(String),

  #[error("unknown task status: {0:?}")]
  UnknownTaskStatus(String),

  #[error("unknown announcement kind: {0:?}")]
  UnknownAnnouncementKind(String),

  #[error("unknown target scope: {0:?}")]
  UnknownTargetScope(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Opaque storage-backend failure; never carries domain meaning.
  #[error("storage error: {0}")]
  Backend(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
