//! The `DirectoryStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `roster-store-sqlite`).
//! Higher layers (`roster-api`) depend on this abstraction, not on any
//! concrete backend. Methods return [`crate::Error`] directly so callers can
//! classify domain failures (not-found, uniqueness, the last-admin floor)
//! without knowing the backend; backend faults travel as [`Error::Backend`]
//! (crate::Error::Backend).
//!
//! Invariant-guarded mutations (`suspend_account`, `sync_roles`,
//! `revoke_role`, `delete_account`) must evaluate the active-admin count in
//! the same transaction as the write, and `activate_theme` must
//! deactivate-and-activate atomically.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Result,
  account::{Account, Department, NewAccount},
  broadcast::{Announcement, NewAnnouncement, NewTheme, SystemTheme},
  hierarchy::ManagerEdge,
  role::{Role, RoleSet},
  task::{NewTask, Project, Task, TaskPatch},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Suspension-status filter for admin account listings, evaluated with the
/// authoritative currently-suspended predicate (not the raw flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
  #[default]
  All,
  Active,
  Suspended,
}

/// Parameters for [`DirectoryStore::list_accounts`].
#[derive(Debug, Clone, Default)]
pub struct AccountQuery {
  /// Case-insensitive substring over name and email.
  pub search:        Option<String>,
  pub role:          Option<Role>,
  pub department_id: Option<Uuid>,
  pub status:        StatusFilter,
}

/// Parameters for [`DirectoryStore::list_tasks`].
#[derive(Debug, Clone)]
pub struct TaskQuery {
  /// Restrict to tasks visible to this account (creator, assignee, or
  /// project owner/creator). `None` means unrestricted (admin).
  pub viewer:      Option<Uuid>,
  pub status:      Option<crate::task::TaskStatus>,
  pub project_id:  Option<Uuid>,
  pub assigned_to: Option<Uuid>,
  pub page:        u32,
  pub per_page:    u32,
}

/// One page of the task listing.
#[derive(Debug, Clone)]
pub struct TaskPage {
  pub tasks:    Vec<Task>,
  pub page:     u32,
  pub per_page: u32,
  pub total:    u64,
}

/// An issued bearer-session row (the token itself is never stored).
#[derive(Debug, Clone)]
pub struct AccessToken {
  pub id:         Uuid,
  pub account_id: Uuid,
}

/// An outstanding password-reset row, keyed by email.
#[derive(Debug, Clone)]
pub struct ResetToken {
  pub token_hash: String,
  pub created_at: DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the Roster directory backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (tokio with `axum`).
pub trait DirectoryStore: Send + Sync {
  // ── Departments ───────────────────────────────────────────────────────

  fn list_departments(
    &self,
  ) -> impl Future<Output = Result<Vec<Department>>> + Send + '_;

  fn get_department(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Department>>> + Send + '_;

  /// Get-or-create a department by name. Used by bootstrap seeding.
  fn ensure_department(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Department>> + Send + '_;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Create an account. Fails with [`Error::NameTaken`](crate::Error::NameTaken)
  /// / [`Error::EmailTaken`](crate::Error::EmailTaken) on uniqueness
  /// violations and [`Error::DepartmentNotFound`]
  /// (crate::Error::DepartmentNotFound) on a dangling department reference.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account>> + Send + '_;

  fn get_account(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>>> + Send + '_;

  fn find_account_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<Account>>> + Send + '_;

  /// Login lookup: both name and email must match the same account.
  fn find_account_by_name_email(
    &self,
    name:  String,
    email: String,
  ) -> impl Future<Output = Result<Option<Account>>> + Send + '_;

  /// Filtered listing, ordered by name.
  fn list_accounts(
    &self,
    query: AccountQuery,
    now:   DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Account>>> + Send + '_;

  /// Fetch a specific set of accounts, ordered by name.
  fn get_accounts(
    &self,
    ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<Account>>> + Send + '_;

  /// Explicit reactivation / lazy-expiry normalisation: clears all three
  /// suspension fields.
  fn clear_suspension(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Account>> + Send + '_;

  /// Suspend an account and revoke all of its access tokens. Enforces the
  /// last-active-admin floor inside the transaction.
  fn suspend_account(
    &self,
    id:     Uuid,
    until:  Option<DateTime<Utc>>,
    reason: Option<String>,
    now:    DateTime<Utc>,
  ) -> impl Future<Output = Result<Account>> + Send + '_;

  /// Delete an account, its tokens, its edges, and its owned projects and
  /// their tasks. Enforces the last-active-admin floor inside the
  /// transaction.
  fn delete_account(
    &self,
    id:  Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  fn set_password_by_email(
    &self,
    email:         String,
    password_hash: String,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  fn count_accounts(&self) -> impl Future<Output = Result<i64>> + Send + '_;

  fn count_currently_suspended(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<i64>> + Send + '_;

  /// Accounts holding `admin` that are not currently suspended.
  fn active_admin_count(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<i64>> + Send + '_;

  fn count_with_any_role(
    &self,
    roles: Vec<Role>,
  ) -> impl Future<Output = Result<i64>> + Send + '_;

  // ── Roles ─────────────────────────────────────────────────────────────

  fn roles_of(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<RoleSet>> + Send + '_;

  /// Replace an account's role set. When the sync removes `admin` from an
  /// active admin, the last-active-admin floor is enforced in-transaction.
  fn sync_roles(
    &self,
    account_id: Uuid,
    roles:      Vec<Role>,
    now:        DateTime<Utc>,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// Grant a single role; a no-op if already held.
  fn grant_role(
    &self,
    account_id: Uuid,
    role:       Role,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// Revoke a single role; a no-op if not held. Revoking `admin` enforces
  /// the last-active-admin floor in-transaction.
  fn revoke_role(
    &self,
    account_id: Uuid,
    role:       Role,
    now:        DateTime<Utc>,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  // ── Credentials ───────────────────────────────────────────────────────

  fn insert_access_token(
    &self,
    account_id: Uuid,
    token_hash: String,
  ) -> impl Future<Output = Result<AccessToken>> + Send + '_;

  fn find_access_token(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<Option<AccessToken>>> + Send + '_;

  fn delete_access_token(
    &self,
    token_id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  fn delete_account_tokens(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// One outstanding reset per email: insert or replace.
  fn upsert_reset_token(
    &self,
    email:      String,
    token_hash: String,
    created_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  fn find_reset_token(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<ResetToken>>> + Send + '_;

  fn delete_reset_token(
    &self,
    email: String,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  // ── Hierarchy ─────────────────────────────────────────────────────────

  /// Record an edge; re-adding an existing pair is a no-op success.
  fn add_edge(
    &self,
    manager_id:     Uuid,
    subordinate_id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// Remove an edge; removing a non-existent pair succeeds silently.
  fn remove_edge(
    &self,
    manager_id:     Uuid,
    subordinate_id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  fn edge_exists(
    &self,
    manager_id:     Uuid,
    subordinate_id: Uuid,
  ) -> impl Future<Output = Result<bool>> + Send + '_;

  /// All edges, optionally restricted to one manager.
  fn list_edges(
    &self,
    manager_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<ManagerEdge>>> + Send + '_;

  fn subordinate_ids(
    &self,
    manager_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>>> + Send + '_;

  fn manager_ids(
    &self,
    subordinate_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>>> + Send + '_;

  // ── Projects ──────────────────────────────────────────────────────────

  fn get_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Project>>> + Send + '_;

  /// Idempotent get-or-create of the account's "Personal Workspace"
  /// project, keyed on (name, owner).
  fn personal_workspace(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Project>> + Send + '_;

  // ── Tasks ─────────────────────────────────────────────────────────────

  fn create_task(
    &self,
    input: NewTask,
  ) -> impl Future<Output = Result<Task>> + Send + '_;

  fn get_task(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Task>>> + Send + '_;

  fn update_task(
    &self,
    id:    Uuid,
    patch: TaskPatch,
  ) -> impl Future<Output = Result<Task>> + Send + '_;

  /// Record the deleting account and remove the row, atomically.
  fn delete_task(
    &self,
    id:         Uuid,
    deleted_by: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// Newest-first page of tasks matching `query`.
  fn list_tasks(
    &self,
    query: TaskQuery,
  ) -> impl Future<Output = Result<TaskPage>> + Send + '_;

  // ── Announcements ─────────────────────────────────────────────────────

  fn create_announcement(
    &self,
    input: NewAnnouncement,
  ) -> impl Future<Output = Result<Announcement>> + Send + '_;

  fn delete_announcement(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// Newest first, up to `limit`.
  fn list_announcements(
    &self,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<Announcement>>> + Send + '_;

  /// Announcements whose active flag is set and whose window contains
  /// `now`. Scope targeting is the caller's concern.
  fn list_active_announcements(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Announcement>>> + Send + '_;

  // ── Themes ────────────────────────────────────────────────────────────

  /// Create a theme; when created active, every other theme is
  /// deactivated in the same transaction.
  fn create_theme(
    &self,
    input: NewTheme,
  ) -> impl Future<Output = Result<SystemTheme>> + Send + '_;

  /// Activate one theme, deactivating all others atomically. Defaults
  /// `starts_at` to `now` when unset.
  fn activate_theme(
    &self,
    id:  Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<SystemTheme>> + Send + '_;

  fn list_themes(
    &self,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<SystemTheme>>> + Send + '_;

  /// The currently active theme (active flag + window), most recently
  /// updated first.
  fn active_theme(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<SystemTheme>>> + Send + '_;
}
