//! [`SqliteStore`] — the SQLite implementation of [`DirectoryStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use roster_core::{
  Result as CoreResult,
  account::{Account, Department, NewAccount},
  authz,
  broadcast::{Announcement, NewAnnouncement, NewTheme, SystemTheme},
  hierarchy::ManagerEdge,
  role::{Role, RoleSet},
  store::{
    AccessToken, AccountQuery, DirectoryStore, ResetToken, StatusFilter,
    TaskPage, TaskQuery,
  },
  task::{NewTask, PERSONAL_WORKSPACE, Project, Task, TaskPatch},
};

use crate::{
  Error,
  encode::{
    ACCOUNT_COLUMNS, ANNOUNCEMENT_COLUMNS, PROJECT_COLUMNS, RawAccount,
    RawAnnouncement, RawDepartment, RawEdge, RawProject, RawTask, RawTheme,
    THEME_COLUMNS, TASK_COLUMNS, account_from_row, announcement_from_row,
    decode_dt, decode_uuid, encode_dt, encode_opt_dt, encode_uuid,
    project_from_row, task_from_row, theme_from_row,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Roster directory store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> crate::Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> crate::Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Synchronous helpers (used inside transactions) ──────────────────────────

/// Currently-suspended condition over the `accounts` columns; `?N` is the
/// RFC 3339 "now" parameter.
fn suspended_sql(now_param: &str) -> String {
  format!(
    "(is_suspended = 1 AND (suspended_until IS NULL OR suspended_until > {now_param}))"
  )
}

fn role_names_sync(
  conn:       &rusqlite::Connection,
  account_id: &str,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn
    .prepare("SELECT role FROM account_roles WHERE account_id = ?1 ORDER BY role")?;
  stmt
    .query_map(rusqlite::params![account_id], |row| row.get(0))?
    .collect()
}

/// Roles as a typed set; names not in the managed set cannot occur through
/// this store's writers and are skipped if present.
fn role_set_sync(
  conn:       &rusqlite::Connection,
  account_id: &str,
) -> rusqlite::Result<RoleSet> {
  let names = role_names_sync(conn, account_id)?;
  Ok(names.iter().filter_map(|n| Role::parse(n).ok()).collect())
}

fn active_admin_count_sync(
  conn:    &rusqlite::Connection,
  now_str: &str,
) -> rusqlite::Result<i64> {
  conn.query_row(
    &format!(
      "SELECT COUNT(*) FROM accounts
       WHERE EXISTS (SELECT 1 FROM account_roles r
                     WHERE r.account_id = accounts.id AND r.role = 'admin')
         AND NOT {}",
      suspended_sql("?1")
    ),
    rusqlite::params![now_str],
    |row| row.get(0),
  )
}

/// Evaluate the last-active-admin floor for a mutation aimed at `target_id`.
/// Must run inside the same transaction as the mutation it guards.
fn admin_floor_blocks(
  conn:      &rusqlite::Connection,
  target_id: &str,
  now_str:   &str,
) -> rusqlite::Result<bool> {
  let roles = role_set_sync(conn, target_id)?;
  let currently_suspended: bool = conn
    .query_row(
      &format!("SELECT {} FROM accounts WHERE id = ?2", suspended_sql("?1")),
      rusqlite::params![now_str, target_id],
      |row| row.get(0),
    )
    .optional()?
    .unwrap_or(false);
  let count = active_admin_count_sync(conn, now_str)?;

  Ok(authz::check_admin_remains(&roles, currently_suspended, count, "user").is_err())
}

fn account_by_id_sync(
  conn: &rusqlite::Connection,
  id:   &str,
) -> rusqlite::Result<Option<RawAccount>> {
  conn
    .query_row(
      &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
      rusqlite::params![id],
      account_from_row,
    )
    .optional()
}

/// Outcome of a guarded account mutation, carried out of the `call` closure.
enum Guarded<T> {
  Done(T),
  NotFound,
  LastAdmin,
}

impl<T> Guarded<T> {
  fn resolve(self, id: Uuid) -> crate::Result<T> {
    match self {
      Guarded::Done(v) => Ok(v),
      Guarded::NotFound => Err(Error::AccountNotFound(id)),
      Guarded::LastAdmin => Err(Error::LastActiveAdmin),
    }
  }
}

enum CreatedAccount {
  Done,
  NameTaken,
  EmailTaken,
  NoDepartment,
}

// ─── DirectoryStore impl ─────────────────────────────────────────────────────

impl DirectoryStore for SqliteStore {
  // ── Departments ───────────────────────────────────────────────────────────

  async fn list_departments(&self) -> CoreResult<Vec<Department>> {
    let raws: Vec<RawDepartment> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare("SELECT id, name, created_at FROM departments ORDER BY name")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawDepartment {
              id:         row.get(0)?,
              name:       row.get(1)?,
              created_at: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)?;

    Ok(
      raws
        .into_iter()
        .map(RawDepartment::into_department)
        .collect::<crate::Result<Vec<_>>>()?,
    )
  }

  async fn get_department(&self, id: Uuid) -> CoreResult<Option<Department>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawDepartment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, name, created_at FROM departments WHERE id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawDepartment {
                  id:         row.get(0)?,
                  name:       row.get(1)?,
                  created_at: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::Database)?;

    Ok(raw.map(RawDepartment::into_department).transpose()?)
  }

  async fn ensure_department(&self, name: String) -> CoreResult<Department> {
    let department = Department {
      id:         Uuid::new_v4(),
      name:       name.clone(),
      created_at: Utc::now(),
    };
    let id_str = encode_uuid(department.id);
    let at_str = encode_dt(department.created_at);

    let raw: RawDepartment = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing = tx
          .query_row(
            "SELECT id, name, created_at FROM departments WHERE name = ?1",
            rusqlite::params![name],
            |row| {
              Ok(RawDepartment {
                id:         row.get(0)?,
                name:       row.get(1)?,
                created_at: row.get(2)?,
              })
            },
          )
          .optional()?;

        let raw = match existing {
          Some(raw) => raw,
          None => {
            tx.execute(
              "INSERT INTO departments (id, name, created_at) VALUES (?1, ?2, ?3)",
              rusqlite::params![id_str, name, at_str],
            )?;
            RawDepartment { id: id_str, name, created_at: at_str }
          }
        };
        tx.commit()?;
        Ok(raw)
      })
      .await
      .map_err(Error::Database)?;

    Ok(raw.into_department()?)
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_account(&self, input: NewAccount) -> CoreResult<Account> {
    let now = Utc::now();
    let account = Account {
      id:                Uuid::new_v4(),
      name:              input.name,
      email:             input.email,
      password_hash:     input.password_hash,
      department_id:     Some(input.department_id),
      is_suspended:      false,
      suspended_until:   None,
      suspension_reason: None,
      created_at:        now,
      updated_at:        now,
    };

    let id_str   = encode_uuid(account.id);
    let name     = account.name.clone();
    let email    = account.email.clone();
    let hash     = account.password_hash.clone();
    let dept_str = encode_uuid(input.department_id);
    let at_str   = encode_dt(now);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let dept_exists: bool = tx
          .query_row(
            "SELECT 1 FROM departments WHERE id = ?1",
            rusqlite::params![dept_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !dept_exists {
          return Ok(CreatedAccount::NoDepartment);
        }

        let name_taken: bool = tx
          .query_row(
            "SELECT 1 FROM accounts WHERE name = ?1",
            rusqlite::params![name],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if name_taken {
          return Ok(CreatedAccount::NameTaken);
        }

        let email_taken: bool = tx
          .query_row(
            "SELECT 1 FROM accounts WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if email_taken {
          return Ok(CreatedAccount::EmailTaken);
        }

        tx.execute(
          "INSERT INTO accounts (
             id, name, email, password_hash, department_id,
             is_suspended, suspended_until, suspension_reason,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, NULL, ?6, ?6)",
          rusqlite::params![id_str, name, email, hash, dept_str, at_str],
        )?;
        tx.commit()?;
        Ok(CreatedAccount::Done)
      })
      .await
      .map_err(Error::Database)?;

    match outcome {
      CreatedAccount::Done => Ok(account),
      CreatedAccount::NameTaken => Err(Error::NameTaken(account.name).into()),
      CreatedAccount::EmailTaken => Err(Error::EmailTaken(account.email).into()),
      CreatedAccount::NoDepartment => {
        Err(Error::DepartmentNotFound(input.department_id).into())
      }
    }
  }

  async fn get_account(&self, id: Uuid) -> CoreResult<Option<Account>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(account_by_id_sync(conn, &id_str)?))
      .await
      .map_err(Error::Database)?;
    Ok(raw.map(RawAccount::into_account).transpose()?)
  }

  async fn find_account_by_email(&self, email: String) -> CoreResult<Option<Account>> {
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"),
              rusqlite::params![email],
              account_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::Database)?;
    Ok(raw.map(RawAccount::into_account).transpose()?)
  }

  async fn find_account_by_name_email(
    &self,
    name:  String,
    email: String,
  ) -> CoreResult<Option<Account>> {
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE name = ?1 AND email = ?2"
              ),
              rusqlite::params![name, email],
              account_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::Database)?;
    Ok(raw.map(RawAccount::into_account).transpose()?)
  }

  async fn list_accounts(
    &self,
    query: AccountQuery,
    now:   DateTime<Utc>,
  ) -> CoreResult<Vec<Account>> {
    let pattern  = query.search.map(|s| format!("%{}%", s.trim().to_lowercase()));
    let role_str = query.role.map(|r| r.as_str().to_owned());
    let dept_str = query.department_id.map(encode_uuid);
    let status   = query.status;
    let now_str  = encode_dt(now);

    let raws: Vec<RawAccount> = self
      .conn
      .call(move |conn| {
        let mut sql =
          format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE 1 = 1");
        let mut binds: Vec<&dyn rusqlite::ToSql> = Vec::new();

        if let Some(pattern) = &pattern {
          sql.push_str(" AND (LOWER(name) LIKE ? OR LOWER(email) LIKE ?)");
          binds.push(pattern);
          binds.push(pattern);
        }
        if let Some(role) = &role_str {
          sql.push_str(
            " AND EXISTS (SELECT 1 FROM account_roles r
                          WHERE r.account_id = accounts.id AND r.role = ?)",
          );
          binds.push(role);
        }
        if let Some(dept) = &dept_str {
          sql.push_str(" AND department_id = ?");
          binds.push(dept);
        }
        match status {
          StatusFilter::All => {}
          StatusFilter::Active => {
            sql.push_str(&format!(" AND NOT {}", suspended_sql("?")));
            binds.push(&now_str);
          }
          StatusFilter::Suspended => {
            sql.push_str(&format!(" AND {}", suspended_sql("?")));
            binds.push(&now_str);
          }
        }
        sql.push_str(" ORDER BY name");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(&binds[..], account_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)?;

    Ok(
      raws
        .into_iter()
        .map(RawAccount::into_account)
        .collect::<crate::Result<Vec<_>>>()?,
    )
  }

  async fn get_accounts(&self, ids: Vec<Uuid>) -> CoreResult<Vec<Account>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let id_strs: Vec<String> = ids.into_iter().map(encode_uuid).collect();

    let raws: Vec<RawAccount> = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; id_strs.len()].join(", ");
        let sql = format!(
          "SELECT {ACCOUNT_COLUMNS} FROM accounts
           WHERE id IN ({placeholders}) ORDER BY name"
        );
        let binds: Vec<&dyn rusqlite::ToSql> =
          id_strs.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(&binds[..], account_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)?;

    Ok(
      raws
        .into_iter()
        .map(RawAccount::into_account)
        .collect::<crate::Result<Vec<_>>>()?,
    )
  }

  async fn clear_suspension(&self, id: Uuid) -> CoreResult<Account> {
    let id_str = encode_uuid(id);
    let now_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE accounts
           SET is_suspended = 0, suspended_until = NULL,
               suspension_reason = NULL, updated_at = ?2
           WHERE id = ?1",
          rusqlite::params![id_str, now_str],
        )?;
        if changed == 0 {
          return Ok(Guarded::NotFound);
        }
        let raw = account_by_id_sync(&tx, &id_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(Guarded::Done(raw))
      })
      .await
      .map_err(Error::Database)?;

    Ok(outcome.resolve(id)?.into_account()?)
  }

  async fn suspend_account(
    &self,
    id:     Uuid,
    until:  Option<DateTime<Utc>>,
    reason: Option<String>,
    now:    DateTime<Utc>,
  ) -> CoreResult<Account> {
    let id_str    = encode_uuid(id);
    let until_str = encode_opt_dt(until);
    let now_str   = encode_dt(now);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if account_by_id_sync(&tx, &id_str)?.is_none() {
          return Ok(Guarded::NotFound);
        }
        if admin_floor_blocks(&tx, &id_str, &now_str)? {
          return Ok(Guarded::LastAdmin);
        }

        tx.execute(
          "UPDATE accounts
           SET is_suspended = 1, suspended_until = ?2,
               suspension_reason = ?3, updated_at = ?4
           WHERE id = ?1",
          rusqlite::params![id_str, until_str, reason, now_str],
        )?;
        tx.execute(
          "DELETE FROM access_tokens WHERE account_id = ?1",
          rusqlite::params![id_str],
        )?;

        let raw = account_by_id_sync(&tx, &id_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(Guarded::Done(raw))
      })
      .await
      .map_err(Error::Database)?;

    Ok(outcome.resolve(id)?.into_account()?)
  }

  async fn delete_account(&self, id: Uuid, now: DateTime<Utc>) -> CoreResult<()> {
    let id_str  = encode_uuid(id);
    let now_str = encode_dt(now);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if account_by_id_sync(&tx, &id_str)?.is_none() {
          return Ok(Guarded::NotFound);
        }
        if admin_floor_blocks(&tx, &id_str, &now_str)? {
          return Ok(Guarded::LastAdmin);
        }

        // Tokens, role rows, edges, and owned projects (with their tasks)
        // go with the account via ON DELETE CASCADE.
        tx.execute("DELETE FROM accounts WHERE id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(Guarded::Done(()))
      })
      .await
      .map_err(Error::Database)?;

    Ok(outcome.resolve(id)?)
  }

  async fn set_password_by_email(
    &self,
    email:         String,
    password_hash: String,
  ) -> CoreResult<()> {
    let now_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE accounts SET password_hash = ?2, updated_at = ?3 WHERE email = ?1",
          rusqlite::params![email, password_hash, now_str],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)?;
    Ok(())
  }

  async fn count_accounts(&self) -> CoreResult<i64> {
    let count = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?)
      })
      .await
      .map_err(Error::Database)?;
    Ok(count)
  }

  async fn count_currently_suspended(&self, now: DateTime<Utc>) -> CoreResult<i64> {
    let now_str = encode_dt(now);
    let count = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM accounts WHERE {}", suspended_sql("?1")),
          rusqlite::params![now_str],
          |row| row.get(0),
        )?)
      })
      .await
      .map_err(Error::Database)?;
    Ok(count)
  }

  async fn active_admin_count(&self, now: DateTime<Utc>) -> CoreResult<i64> {
    let now_str = encode_dt(now);
    let count = self
      .conn
      .call(move |conn| Ok(active_admin_count_sync(conn, &now_str)?))
      .await
      .map_err(Error::Database)?;
    Ok(count)
  }

  async fn count_with_any_role(&self, roles: Vec<Role>) -> CoreResult<i64> {
    if roles.is_empty() {
      return Ok(0);
    }
    let names: Vec<String> =
      roles.into_iter().map(|r| r.as_str().to_owned()).collect();

    let count = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
          "SELECT COUNT(DISTINCT account_id) FROM account_roles
           WHERE role IN ({placeholders})"
        );
        let binds: Vec<&dyn rusqlite::ToSql> =
          names.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
        Ok(conn.query_row(&sql, &binds[..], |row| row.get(0))?)
      })
      .await
      .map_err(Error::Database)?;
    Ok(count)
  }

  // ── Roles ─────────────────────────────────────────────────────────────────

  async fn roles_of(&self, account_id: Uuid) -> CoreResult<RoleSet> {
    let id_str = encode_uuid(account_id);
    let names: Vec<String> = self
      .conn
      .call(move |conn| Ok(role_names_sync(conn, &id_str)?))
      .await
      .map_err(Error::Database)?;

    let roles = names
      .iter()
      .map(|n| Role::parse(n))
      .collect::<CoreResult<Vec<_>>>()?;
    Ok(RoleSet::new(roles))
  }

  async fn sync_roles(
    &self,
    account_id: Uuid,
    roles:      Vec<Role>,
    now:        DateTime<Utc>,
  ) -> CoreResult<()> {
    let id_str  = encode_uuid(account_id);
    let now_str = encode_dt(now);
    let keeps_admin = roles.contains(&Role::Admin);
    let names: Vec<String> =
      roles.into_iter().map(|r| r.as_str().to_owned()).collect();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if account_by_id_sync(&tx, &id_str)?.is_none() {
          return Ok(Guarded::NotFound);
        }
        if !keeps_admin && admin_floor_blocks(&tx, &id_str, &now_str)? {
          return Ok(Guarded::LastAdmin);
        }

        tx.execute(
          "DELETE FROM account_roles WHERE account_id = ?1",
          rusqlite::params![id_str],
        )?;
        for name in &names {
          tx.execute(
            "INSERT OR IGNORE INTO account_roles (account_id, role) VALUES (?1, ?2)",
            rusqlite::params![id_str, name],
          )?;
        }
        tx.execute(
          "UPDATE accounts SET updated_at = ?2 WHERE id = ?1",
          rusqlite::params![id_str, now_str],
        )?;
        tx.commit()?;
        Ok(Guarded::Done(()))
      })
      .await
      .map_err(Error::Database)?;

    Ok(outcome.resolve(account_id)?)
  }

  async fn grant_role(&self, account_id: Uuid, role: Role) -> CoreResult<()> {
    let id_str = encode_uuid(account_id);
    let name   = role.as_str();

    let outcome = self
      .conn
      .call(move |conn| {
        if account_by_id_sync(conn, &id_str)?.is_none() {
          return Ok(Guarded::NotFound);
        }
        conn.execute(
          "INSERT OR IGNORE INTO account_roles (account_id, role) VALUES (?1, ?2)",
          rusqlite::params![id_str, name],
        )?;
        Ok(Guarded::Done(()))
      })
      .await
      .map_err(Error::Database)?;

    Ok(outcome.resolve(account_id)?)
  }

  async fn revoke_role(
    &self,
    account_id: Uuid,
    role:       Role,
    now:        DateTime<Utc>,
  ) -> CoreResult<()> {
    let id_str  = encode_uuid(account_id);
    let now_str = encode_dt(now);
    let name    = role.as_str();
    let is_admin_role = role == Role::Admin;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if account_by_id_sync(&tx, &id_str)?.is_none() {
          return Ok(Guarded::NotFound);
        }
        if is_admin_role && admin_floor_blocks(&tx, &id_str, &now_str)? {
          return Ok(Guarded::LastAdmin);
        }
        tx.execute(
          "DELETE FROM account_roles WHERE account_id = ?1 AND role = ?2",
          rusqlite::params![id_str, name],
        )?;
        tx.commit()?;
        Ok(Guarded::Done(()))
      })
      .await
      .map_err(Error::Database)?;

    Ok(outcome.resolve(account_id)?)
  }

  // ── Credentials ───────────────────────────────────────────────────────────

  async fn insert_access_token(
    &self,
    account_id: Uuid,
    token_hash: String,
  ) -> CoreResult<AccessToken> {
    let token = AccessToken { id: Uuid::new_v4(), account_id };
    let id_str      = encode_uuid(token.id);
    let account_str = encode_uuid(account_id);
    let at_str      = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO access_tokens (id, account_id, token_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, account_str, token_hash, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)?;

    Ok(token)
  }

  async fn find_access_token(
    &self,
    token_hash: String,
  ) -> CoreResult<Option<AccessToken>> {
    let raw: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, account_id FROM access_tokens WHERE token_hash = ?1",
              rusqlite::params![token_hash],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::Database)?;

    match raw {
      None => Ok(None),
      Some((id, account_id)) => Ok(Some(AccessToken {
        id:         decode_uuid(&id)?,
        account_id: decode_uuid(&account_id)?,
      })),
    }
  }

  async fn delete_access_token(&self, token_id: Uuid) -> CoreResult<()> {
    let id_str = encode_uuid(token_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM access_tokens WHERE id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)?;
    Ok(())
  }

  async fn delete_account_tokens(&self, account_id: Uuid) -> CoreResult<()> {
    let id_str = encode_uuid(account_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM access_tokens WHERE account_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)?;
    Ok(())
  }

  async fn upsert_reset_token(
    &self,
    email:      String,
    token_hash: String,
    created_at: DateTime<Utc>,
  ) -> CoreResult<()> {
    let at_str = encode_dt(created_at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO password_resets (email, token_hash, created_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(email) DO UPDATE SET
             token_hash = excluded.token_hash,
             created_at = excluded.created_at",
          rusqlite::params![email, token_hash, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)?;
    Ok(())
  }

  async fn find_reset_token(&self, email: String) -> CoreResult<Option<ResetToken>> {
    let raw: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT token_hash, created_at FROM password_resets WHERE email = ?1",
              rusqlite::params![email],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::Database)?;

    match raw {
      None => Ok(None),
      Some((token_hash, created_at)) => Ok(Some(ResetToken {
        token_hash,
        created_at: decode_dt(&created_at)?,
      })),
    }
  }

  async fn delete_reset_token(&self, email: String) -> CoreResult<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM password_resets WHERE email = ?1",
          rusqlite::params![email],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)?;
    Ok(())
  }

  // ── Hierarchy ─────────────────────────────────────────────────────────────

  async fn add_edge(&self, manager_id: Uuid, subordinate_id: Uuid) -> CoreResult<()> {
    let id_str  = encode_uuid(Uuid::new_v4());
    let mgr_str = encode_uuid(manager_id);
    let sub_str = encode_uuid(subordinate_id);
    let at_str  = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO manager_subordinates
             (id, manager_id, subordinate_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, mgr_str, sub_str, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)?;
    Ok(())
  }

  async fn remove_edge(
    &self,
    manager_id:     Uuid,
    subordinate_id: Uuid,
  ) -> CoreResult<()> {
    let mgr_str = encode_uuid(manager_id);
    let sub_str = encode_uuid(subordinate_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM manager_subordinates
           WHERE manager_id = ?1 AND subordinate_id = ?2",
          rusqlite::params![mgr_str, sub_str],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)?;
    Ok(())
  }

  async fn edge_exists(
    &self,
    manager_id:     Uuid,
    subordinate_id: Uuid,
  ) -> CoreResult<bool> {
    let mgr_str = encode_uuid(manager_id);
    let sub_str = encode_uuid(subordinate_id);

    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM manager_subordinates
               WHERE manager_id = ?1 AND subordinate_id = ?2",
              rusqlite::params![mgr_str, sub_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await
      .map_err(Error::Database)?;
    Ok(exists)
  }

  async fn list_edges(&self, manager_id: Option<Uuid>) -> CoreResult<Vec<ManagerEdge>> {
    let mgr_str = manager_id.map(encode_uuid);

    let raws: Vec<RawEdge> = self
      .conn
      .call(move |conn| {
        let mut sql = String::from(
          "SELECT id, manager_id, subordinate_id, created_at
           FROM manager_subordinates WHERE 1 = 1",
        );
        let mut binds: Vec<&dyn rusqlite::ToSql> = Vec::new();
        if let Some(mgr) = &mgr_str {
          sql.push_str(" AND manager_id = ?");
          binds.push(mgr);
        }
        sql.push_str(" ORDER BY manager_id, created_at");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(&binds[..], |row| {
            Ok(RawEdge {
              id:             row.get(0)?,
              manager_id:     row.get(1)?,
              subordinate_id: row.get(2)?,
              created_at:     row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)?;

    Ok(
      raws
        .into_iter()
        .map(RawEdge::into_edge)
        .collect::<crate::Result<Vec<_>>>()?,
    )
  }

  async fn subordinate_ids(&self, manager_id: Uuid) -> CoreResult<Vec<Uuid>> {
    let mgr_str = encode_uuid(manager_id);
    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT subordinate_id FROM manager_subordinates WHERE manager_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![mgr_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)?;

    Ok(
      ids
        .iter()
        .map(|s| decode_uuid(s))
        .collect::<crate::Result<Vec<_>>>()?,
    )
  }

  async fn manager_ids(&self, subordinate_id: Uuid) -> CoreResult<Vec<Uuid>> {
    let sub_str = encode_uuid(subordinate_id);
    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT manager_id FROM manager_subordinates WHERE subordinate_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![sub_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)?;

    Ok(
      ids
        .iter()
        .map(|s| decode_uuid(s))
        .collect::<crate::Result<Vec<_>>>()?,
    )
  }

  // ── Projects ──────────────────────────────────────────────────────────────

  async fn get_project(&self, id: Uuid) -> CoreResult<Option<Project>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
              rusqlite::params![id_str],
              project_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::Database)?;
    Ok(raw.map(RawProject::into_project).transpose()?)
  }

  async fn personal_workspace(&self, account_id: Uuid) -> CoreResult<Project> {
    let owner_str = encode_uuid(account_id);
    let new_id    = encode_uuid(Uuid::new_v4());
    let at_str    = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing = tx
          .query_row(
            &format!(
              "SELECT {PROJECT_COLUMNS} FROM projects WHERE name = ?1 AND user_id = ?2"
            ),
            rusqlite::params![PERSONAL_WORKSPACE, owner_str],
            project_from_row,
          )
          .optional()?;

        let raw = match existing {
          Some(raw) => raw,
          None => {
            tx.execute(
              "INSERT INTO projects
                 (id, name, description, user_id, created_by, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?5)",
              rusqlite::params![
                new_id,
                PERSONAL_WORKSPACE,
                "Auto-created personal project",
                owner_str,
                at_str,
              ],
            )?;
            tx.query_row(
              &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
              rusqlite::params![new_id],
              project_from_row,
            )?
          }
        };
        tx.commit()?;
        Ok(raw)
      })
      .await
      .map_err(Error::Database)?;

    Ok(raw.into_project()?)
  }

  // ── Tasks ─────────────────────────────────────────────────────────────────

  async fn create_task(&self, input: NewTask) -> CoreResult<Task> {
    let now = Utc::now();
    let task = Task {
      id:          Uuid::new_v4(),
      project_id:  input.project_id,
      title:       input.title,
      description: input.description,
      status:      input.status,
      due_date:    input.due_date,
      assigned_to: input.assigned_to,
      user_id:     input.actor_id,
      created_by:  input.actor_id,
      updated_by:  input.actor_id,
      created_at:  now,
      updated_at:  now,
    };

    let id_str       = encode_uuid(task.id);
    let project_str  = encode_uuid(task.project_id);
    let title        = task.title.clone();
    let description  = task.description.clone();
    let status       = task.status.as_str();
    let due_str      = encode_opt_dt(task.due_date);
    let assigned_str = task.assigned_to.map(encode_uuid);
    let actor_str    = encode_uuid(input.actor_id);
    let at_str       = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tasks (
             id, project_id, title, description, status, due_date,
             assigned_to, user_id, created_by, updated_by,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?8, ?9, ?9)",
          rusqlite::params![
            id_str,
            project_str,
            title,
            description,
            status,
            due_str,
            assigned_str,
            actor_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)?;

    Ok(task)
  }

  async fn get_task(&self, id: Uuid) -> CoreResult<Option<Task>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
              rusqlite::params![id_str],
              task_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::Database)?;
    Ok(raw.map(RawTask::into_task).transpose()?)
  }

  async fn update_task(&self, id: Uuid, patch: TaskPatch) -> CoreResult<Task> {
    let mut task = self.get_task(id).await?.ok_or(Error::TaskNotFound(id))?;

    if let Some(project_id) = patch.project_id {
      task.project_id = project_id;
    }
    if let Some(title) = patch.title {
      task.title = title;
    }
    if let Some(description) = patch.description {
      task.description = description;
    }
    if let Some(status) = patch.status {
      task.status = status;
    }
    if let Some(due_date) = patch.due_date {
      task.due_date = due_date;
    }
    if let Some(assigned_to) = patch.assigned_to {
      task.assigned_to = assigned_to;
    }
    task.updated_by = patch.actor_id;
    task.updated_at = Utc::now();

    let id_str       = encode_uuid(task.id);
    let project_str  = encode_uuid(task.project_id);
    let title        = task.title.clone();
    let description  = task.description.clone();
    let status       = task.status.as_str();
    let due_str      = encode_opt_dt(task.due_date);
    let assigned_str = task.assigned_to.map(encode_uuid);
    let updated_by   = encode_uuid(task.updated_by);
    let at_str       = encode_dt(task.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE tasks SET
             project_id = ?2, title = ?3, description = ?4, status = ?5,
             due_date = ?6, assigned_to = ?7, updated_by = ?8, updated_at = ?9
           WHERE id = ?1",
          rusqlite::params![
            id_str,
            project_str,
            title,
            description,
            status,
            due_str,
            assigned_str,
            updated_by,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)?;

    Ok(task)
  }

  async fn delete_task(&self, id: Uuid, deleted_by: Uuid) -> CoreResult<()> {
    let id_str      = encode_uuid(id);
    let deleter_str = encode_uuid(deleted_by);

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE tasks SET deleted_by = ?2 WHERE id = ?1",
          rusqlite::params![id_str, deleter_str],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        tx.execute("DELETE FROM tasks WHERE id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(true)
      })
      .await
      .map_err(Error::Database)?;

    if !found {
      return Err(Error::TaskNotFound(id).into());
    }
    Ok(())
  }

  async fn list_tasks(&self, query: TaskQuery) -> CoreResult<TaskPage> {
    let viewer_str   = query.viewer.map(encode_uuid);
    let status_str   = query.status.map(|s| s.as_str().to_owned());
    let project_str  = query.project_id.map(encode_uuid);
    let assigned_str = query.assigned_to.map(encode_uuid);
    let page         = query.page.max(1);
    let per_page     = query.per_page.clamp(1, 100);
    let limit        = per_page as i64;
    let offset       = (page as i64 - 1) * per_page as i64;

    let (raws, total) = self
      .conn
      .call(move |conn| {
        let mut where_clause = String::from(" WHERE 1 = 1");
        let mut binds: Vec<&dyn rusqlite::ToSql> = Vec::new();

        if let Some(viewer) = &viewer_str {
          where_clause.push_str(
            " AND (tasks.created_by = ?1 OR tasks.assigned_to = ?1
               OR EXISTS (SELECT 1 FROM projects p
                          WHERE p.id = tasks.project_id
                            AND (p.created_by = ?1 OR p.user_id = ?1)))",
          );
          binds.push(viewer);
        }
        if let Some(status) = &status_str {
          where_clause.push_str(" AND tasks.status = ?");
          binds.push(status);
        }
        if let Some(project) = &project_str {
          where_clause.push_str(" AND tasks.project_id = ?");
          binds.push(project);
        }
        if let Some(assigned) = &assigned_str {
          where_clause.push_str(" AND tasks.assigned_to = ?");
          binds.push(assigned);
        }

        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM tasks{where_clause}"),
          &binds[..],
          |row| row.get(0),
        )?;

        let sql = format!(
          "SELECT {TASK_COLUMNS} FROM tasks{where_clause}
           ORDER BY tasks.created_at DESC LIMIT ? OFFSET ?"
        );
        binds.push(&limit);
        binds.push(&offset);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(&binds[..], task_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, total))
      })
      .await
      .map_err(Error::Database)?;

    let tasks = raws
      .into_iter()
      .map(RawTask::into_task)
      .collect::<crate::Result<Vec<_>>>()?;

    Ok(TaskPage { tasks, page, per_page, total: total.max(0) as u64 })
  }

  // ── Announcements ─────────────────────────────────────────────────────────

  async fn create_announcement(
    &self,
    input: NewAnnouncement,
  ) -> CoreResult<Announcement> {
    let now = Utc::now();
    let announcement = Announcement {
      id:                   Uuid::new_v4(),
      title:                input.title,
      message:              input.message,
      kind:                 input.kind,
      target_scope:         input.target_scope,
      target_role:          input.target_role,
      target_department_id: input.target_department_id,
      is_pinned:            input.is_pinned,
      is_active:            input.is_active,
      starts_at:            input.starts_at,
      ends_at:              input.ends_at,
      created_by:           input.created_by,
      created_at:           now,
      updated_at:           now,
    };

    let id_str       = encode_uuid(announcement.id);
    let title        = announcement.title.clone();
    let message      = announcement.message.clone();
    let kind         = announcement.kind.as_str();
    let scope        = announcement.target_scope.as_str();
    let role         = announcement.target_role.clone();
    let dept_str     = announcement.target_department_id.map(encode_uuid);
    let is_pinned    = announcement.is_pinned;
    let is_active    = announcement.is_active;
    let starts_str   = encode_opt_dt(announcement.starts_at);
    let ends_str     = encode_opt_dt(announcement.ends_at);
    let creator_str  = encode_uuid(announcement.created_by);
    let at_str       = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO announcements (
             id, title, message, kind, target_scope, target_role,
             target_department_id, is_pinned, is_active, starts_at, ends_at,
             created_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
          rusqlite::params![
            id_str,
            title,
            message,
            kind,
            scope,
            role,
            dept_str,
            is_pinned,
            is_active,
            starts_str,
            ends_str,
            creator_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)?;

    Ok(announcement)
  }

  async fn delete_announcement(&self, id: Uuid) -> CoreResult<()> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM announcements WHERE id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await
      .map_err(Error::Database)?;

    if changed == 0 {
      return Err(Error::AnnouncementNotFound(id).into());
    }
    Ok(())
  }

  async fn list_announcements(&self, limit: u32) -> CoreResult<Vec<Announcement>> {
    let limit = limit as i64;
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements
           ORDER BY created_at DESC LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit], announcement_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)?;

    Ok(
      raws
        .into_iter()
        .map(RawAnnouncement::into_announcement)
        .collect::<crate::Result<Vec<_>>>()?,
    )
  }

  async fn list_active_announcements(
    &self,
    now: DateTime<Utc>,
  ) -> CoreResult<Vec<Announcement>> {
    let now_str = encode_dt(now);
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements
           WHERE is_active = 1
             AND (starts_at IS NULL OR starts_at <= ?1)
             AND (ends_at IS NULL OR ends_at >= ?1)
           ORDER BY is_pinned DESC, created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![now_str], announcement_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)?;

    Ok(
      raws
        .into_iter()
        .map(RawAnnouncement::into_announcement)
        .collect::<crate::Result<Vec<_>>>()?,
    )
  }

  // ── Themes ────────────────────────────────────────────────────────────────

  async fn create_theme(&self, input: NewTheme) -> CoreResult<SystemTheme> {
    let now = Utc::now();
    let theme = SystemTheme {
      id:             Uuid::new_v4(),
      name:           input.name,
      tagline:        input.tagline,
      banner_message: input.banner_message,
      primary_color:  input.primary_color,
      accent_color:   input.accent_color,
      surface_color:  input.surface_color,
      is_active:      input.is_active,
      starts_at:      input.starts_at,
      ends_at:        input.ends_at,
      meta:           input.meta,
      created_by:     input.created_by,
      created_at:     now,
      updated_at:     now,
    };

    let id_str      = encode_uuid(theme.id);
    let name        = theme.name.clone();
    let tagline     = theme.tagline.clone();
    let banner      = theme.banner_message.clone();
    let primary     = theme.primary_color.clone();
    let accent      = theme.accent_color.clone();
    let surface     = theme.surface_color.clone();
    let is_active   = theme.is_active;
    let starts_str  = encode_opt_dt(theme.starts_at);
    let ends_str    = encode_opt_dt(theme.ends_at);
    let meta_str    = theme
      .meta
      .as_ref()
      .map(serde_json::to_string)
      .transpose()
      .map_err(Error::Json)?;
    let creator_str = encode_uuid(theme.created_by);
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if is_active {
          tx.execute("UPDATE system_themes SET is_active = 0", [])?;
        }
        tx.execute(
          "INSERT INTO system_themes (
             id, name, tagline, banner_message, primary_color, accent_color,
             surface_color, is_active, starts_at, ends_at, meta,
             created_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
          rusqlite::params![
            id_str,
            name,
            tagline,
            banner,
            primary,
            accent,
            surface,
            is_active,
            starts_str,
            ends_str,
            meta_str,
            creator_str,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(Error::Database)?;

    Ok(theme)
  }

  async fn activate_theme(&self, id: Uuid, now: DateTime<Utc>) -> CoreResult<SystemTheme> {
    let id_str  = encode_uuid(id);
    let now_str = encode_dt(now);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM system_themes WHERE id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          tx.commit()?;
          return Ok(None);
        }

        tx.execute(
          "UPDATE system_themes SET is_active = 0 WHERE id != ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "UPDATE system_themes
           SET is_active = 1,
               starts_at = COALESCE(starts_at, ?2),
               updated_at = ?2
           WHERE id = ?1",
          rusqlite::params![id_str, now_str],
        )?;

        let raw = tx.query_row(
          &format!("SELECT {THEME_COLUMNS} FROM system_themes WHERE id = ?1"),
          rusqlite::params![id_str],
          theme_from_row,
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await
      .map_err(Error::Database)?;

    match raw {
      None => Err(Error::ThemeNotFound(id).into()),
      Some(raw) => Ok(raw.into_theme()?),
    }
  }

  async fn list_themes(&self, limit: u32) -> CoreResult<Vec<SystemTheme>> {
    let limit = limit as i64;
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {THEME_COLUMNS} FROM system_themes
           ORDER BY created_at DESC LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit], theme_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)?;

    Ok(
      raws
        .into_iter()
        .map(RawTheme::into_theme)
        .collect::<crate::Result<Vec<_>>>()?,
    )
  }

  async fn active_theme(&self, now: DateTime<Utc>) -> CoreResult<Option<SystemTheme>> {
    let now_str = encode_dt(now);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {THEME_COLUMNS} FROM system_themes
                 WHERE is_active = 1
                   AND (starts_at IS NULL OR starts_at <= ?1)
                   AND (ends_at IS NULL OR ends_at >= ?1)
                 ORDER BY updated_at DESC LIMIT 1"
              ),
              rusqlite::params![now_str],
              theme_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::Database)?;

    Ok(raw.map(RawTheme::into_theme).transpose()?)
  }
}
