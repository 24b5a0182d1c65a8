//! SQL schema for the Roster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS departments (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    id                 TEXT PRIMARY KEY,
    name               TEXT NOT NULL UNIQUE,
    email              TEXT NOT NULL UNIQUE,
    password_hash      TEXT NOT NULL,   -- argon2 PHC string
    department_id      TEXT REFERENCES departments(id) ON DELETE SET NULL,
    is_suspended       INTEGER NOT NULL DEFAULT 0,
    suspended_until    TEXT,            -- ISO 8601 UTC or NULL (indefinite)
    suspension_reason  TEXT,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

-- Role membership; role names come from the fixed managed set.
CREATE TABLE IF NOT EXISTS account_roles (
    account_id  TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    role        TEXT NOT NULL,
    UNIQUE (account_id, role)
);

-- One row per issued bearer session; the plaintext token is never stored.
CREATE TABLE IF NOT EXISTS access_tokens (
    id          TEXT PRIMARY KEY,
    account_id  TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    token_hash  TEXT NOT NULL UNIQUE,   -- SHA-256 hex digest
    created_at  TEXT NOT NULL
);

-- At most one outstanding reset per email.
CREATE TABLE IF NOT EXISTS password_resets (
    email       TEXT PRIMARY KEY,
    token_hash  TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS manager_subordinates (
    id              TEXT PRIMARY KEY,
    manager_id      TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    subordinate_id  TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    created_at      TEXT NOT NULL,
    UNIQUE (manager_id, subordinate_id),
    CHECK  (manager_id != subordinate_id)
);

CREATE TABLE IF NOT EXISTS projects (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    description  TEXT,
    user_id      TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    created_by   TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (name, user_id)
);

CREATE TABLE IF NOT EXISTS tasks (
    id           TEXT PRIMARY KEY,
    project_id   TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    title        TEXT NOT NULL,
    description  TEXT,
    status       TEXT NOT NULL DEFAULT 'pending',
    due_date     TEXT,
    assigned_to  TEXT REFERENCES accounts(id) ON DELETE SET NULL,
    user_id      TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    created_by   TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    updated_by   TEXT NOT NULL,   -- audit only; survives account deletion
    deleted_by   TEXT,            -- audit only; written just before DELETE
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS announcements (
    id                    TEXT PRIMARY KEY,
    title                 TEXT NOT NULL,
    message               TEXT NOT NULL,
    kind                  TEXT NOT NULL DEFAULT 'info',
    target_scope          TEXT NOT NULL DEFAULT 'all',
    target_role           TEXT,
    target_department_id  TEXT REFERENCES departments(id) ON DELETE SET NULL,
    is_pinned             INTEGER NOT NULL DEFAULT 0,
    is_active             INTEGER NOT NULL DEFAULT 1,
    starts_at             TEXT,
    ends_at               TEXT,
    created_by            TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS system_themes (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    tagline         TEXT,
    banner_message  TEXT,
    primary_color   TEXT NOT NULL DEFAULT '#0f172a',
    accent_color    TEXT NOT NULL DEFAULT '#2563eb',
    surface_color   TEXT NOT NULL DEFAULT '#ffffff',
    is_active       INTEGER NOT NULL DEFAULT 0,
    starts_at       TEXT,
    ends_at         TEXT,
    meta            TEXT,   -- JSON object or NULL
    created_by      TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS account_roles_account_idx ON account_roles(account_id);
CREATE INDEX IF NOT EXISTS access_tokens_account_idx ON access_tokens(account_id);
CREATE INDEX IF NOT EXISTS edges_manager_idx         ON manager_subordinates(manager_id);
CREATE INDEX IF NOT EXISTS edges_subordinate_idx     ON manager_subordinates(subordinate_id);
CREATE INDEX IF NOT EXISTS tasks_project_idx         ON tasks(project_id);
CREATE INDEX IF NOT EXISTS tasks_assigned_idx        ON tasks(assigned_to);
CREATE INDEX IF NOT EXISTS tasks_created_by_idx      ON tasks(created_by);

PRAGMA user_version = 1;
";
