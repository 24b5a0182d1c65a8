//! Error type for `roster-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] roster_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("account not found: {0}")]
  AccountNotFound(Uuid),

  #[error("department not found: {0}")]
  DepartmentNotFound(Uuid),

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

  #[error("at least one active admin must remain")]
  LastActiveAdmin,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Collapse into the core error type at the [`DirectoryStore`]
/// (roster_core::store::DirectoryStore) boundary. Domain variants map
/// one-to-one; infrastructure faults become opaque backend errors.
impl From<Error> for roster_core::Error {
  fn from(err: Error) -> Self {
    use roster_core::Error as Core;
    match err {
      Error::Core(e) => e,
      Error::AccountNotFound(id) => Core::AccountNotFound(id),
      Error::DepartmentNotFound(id) => Core::DepartmentNotFound(id),
      Error::TaskNotFound(id) => Core::TaskNotFound(id),
      Error::AnnouncementNotFound(id) => Core::AnnouncementNotFound(id),
      Error::ThemeNotFound(id) => Core::ThemeNotFound(id),
      Error::NameTaken(name) => Core::NameTaken(name),
      Error::EmailTaken(email) => Core::EmailTaken(email),
      Error::LastActiveAdmin => Core::LastActiveAdmin,
      other @ (Error::Database(_)
      | Error::Json(_)
      | Error::Uuid(_)
      | Error::DateParse(_)) => Core::Backend(other.to_string()),
    }
  }
}
