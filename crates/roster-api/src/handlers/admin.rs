//! Admin-only user management, announcements, and themes.
//!
//! Every mutating endpoint here answers with a `message` plus the updated
//! resource. The self-protection checks run first; the last-active-admin
//! floor is enforced inside the store transaction that performs the write.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use roster_core::{
  Error as CoreError,
  account::{Account, NewAccount},
  authz::{self, ProtectedAction},
  broadcast::{AnnouncementKind, NewAnnouncement, NewTheme, TargetScope},
  role::{Role, primary_role_sync},
  store::{AccountQuery, DirectoryStore, StatusFilter},
};

use crate::{
  AppState,
  auth::{self as credentials, AdminUser},
  error::{ApiError, FieldErrors},
  handlers::auth::map_account_creation_error,
  present,
  validate,
};

const ADMIN_FLOOR_MESSAGE: &str =
  "At least one active admin must remain in the system.";

/// Store-level floor violations surface as a field-scoped 422 so clients
/// can render them inline.
pub(crate) fn map_floor_error(err: CoreError, field: &'static str) -> ApiError {
  match err {
    CoreError::LastActiveAdmin => {
      ApiError::validation(field, ADMIN_FLOOR_MESSAGE)
    }
    CoreError::AccountNotFound(_) => {
      ApiError::NotFound("User not found.".to_string())
    }
    other => ApiError::Store(other),
  }
}

async fn load_target<S>(state: &AppState<S>, id: Uuid) -> Result<Account, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .get_account(id)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// `GET /admin/summary`
pub async fn summary<S>(
  State(state): State<AppState<S>>,
  _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let now = Utc::now();
  let total_users = state.store.count_accounts().await?;
  let suspended_users = state.store.count_currently_suspended(now).await?;
  let department_count = state.store.list_departments().await?.len();
  let manager_count = state.store.count_with_any_role(vec![Role::Manager]).await?;
  let staff_count = state
    .store
    .count_with_any_role(vec![Role::Staff, Role::Watchman, Role::Chef, Role::User])
    .await?;
  let announcement_count =
    state.store.list_active_announcements(now).await?.len();
  let active_theme = state.store.active_theme(now).await?;

  Ok(Json(json!({
    "total_users": total_users,
    "active_users": (total_users - suspended_users).max(0),
    "suspended_users": suspended_users,
    "department_count": department_count,
    "manager_count": manager_count,
    "staff_count": staff_count,
    "announcement_count": announcement_count,
    "active_theme": active_theme,
  })))
}

// ─── User listing ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
  pub search:        Option<String>,
  pub role:          Option<String>,
  pub department_id: Option<Uuid>,
  pub status:        Option<String>,
}

/// `GET /admin/users` — filtered listing, ordered by name. The status
/// filter uses the authoritative currently-suspended predicate.
pub async fn users<S>(
  State(state): State<AppState<S>>,
  _admin: AdminUser,
  Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let mut errors = FieldErrors::new();
  if let Some(search) = query.search.as_deref() {
    validate::max_len(&mut errors, "search", search, 120);
  }
  let role = match query.role.as_deref() {
    Some(name) => match Role::parse(name) {
      Ok(role) => Some(role),
      Err(_) => {
        errors.push("role", "The selected role is invalid.");
        None
      }
    },
    None => None,
  };
  let status = match query.status.as_deref() {
    None | Some("all") => StatusFilter::All,
    Some("active") => StatusFilter::Active,
    Some("suspended") => StatusFilter::Suspended,
    Some(_) => {
      errors.push("status", "The selected status is invalid.");
      StatusFilter::All
    }
  };
  errors.into_result()?;

  if let Some(id) = query.department_id
    && state.store.get_department(id).await?.is_none()
  {
    return Err(ApiError::validation(
      "department_id",
      "The selected department_id is invalid.",
    ));
  }

  let accounts = state
    .store
    .list_accounts(
      AccountQuery {
        search: query.search.filter(|s| !s.trim().is_empty()),
        role,
        department_id: query.department_id,
        status,
      },
      Utc::now(),
    )
    .await?;

  Ok(Json(present::account_views(&*state.store, accounts).await?))
}

// ─── User creation ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
  pub name:          Option<String>,
  pub email:         Option<String>,
  pub department_id: Option<Uuid>,
  pub password:      Option<String>,
  pub role:          Option<String>,
}

/// `POST /admin/users`
pub async fn create_user<S>(
  State(state): State<AppState<S>>,
  _admin: AdminUser,
  Json(body): Json<CreateUserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let mut errors = FieldErrors::new();
  let name = validate::require(&mut errors, "name", body.name.as_deref());
  if let Some(name) = name {
    validate::max_len(&mut errors, "name", name, 255);
  }
  let email = validate::require(&mut errors, "email", body.email.as_deref());
  if let Some(email) = email {
    validate::email_shape(&mut errors, "email", email);
    validate::max_len(&mut errors, "email", email, 255);
  }
  if body.department_id.is_none() {
    errors.push("department_id", "The department_id field is required.");
  }
  let password =
    validate::require(&mut errors, "password", body.password.as_deref());
  if let Some(password) = password {
    validate::min_len(&mut errors, "password", password, 8);
  }
  let primary = match body.role.as_deref() {
    Some(name) => match Role::parse(name) {
      Ok(role) => role,
      Err(_) => {
        errors.push("role", "The selected role is invalid.");
        Role::User
      }
    },
    None => Role::User,
  };
  errors.into_result()?;

  let account = state
    .store
    .create_account(NewAccount {
      name: name.unwrap_or_default().to_string(),
      email: email.unwrap_or_default().to_string(),
      password_hash: credentials::hash_password(password.unwrap_or_default())?,
      department_id: body.department_id.unwrap_or_default(),
    })
    .await
    .map_err(map_account_creation_error)?;

  state
    .store
    .sync_roles(account.id, primary_role_sync(primary), Utc::now())
    .await?;

  let user = present::account_view(&*state.store, account).await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({ "message": "User created successfully.", "user": user })),
  ))
}

// ─── Role update ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateRoleBody {
  pub role: Option<String>,
}

/// `PATCH /admin/users/{user}/role` — syncs the full role set from the
/// chosen primary role.
pub async fn update_user_role<S>(
  State(state): State<AppState<S>>,
  admin: AdminUser,
  Path(user_id): Path<Uuid>,
  Json(body): Json<UpdateRoleBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let role_name = body.role.as_deref().ok_or_else(|| {
    ApiError::validation("role", "The role field is required.")
  })?;
  let primary = Role::parse(role_name)
    .map_err(|_| ApiError::validation("role", "The selected role is invalid."))?;

  let target = load_target(&state, user_id).await?;
  if primary != Role::Admin {
    authz::check_self_preservation(
      admin.0.account.id,
      target.id,
      ProtectedAction::DowngradeRole,
    )?;
  }

  state
    .store
    .sync_roles(target.id, primary_role_sync(primary), Utc::now())
    .await
    .map_err(|e| map_floor_error(e, "role"))?;

  let user = present::account_view(&*state.store, target).await?;
  Ok(Json(json!({ "message": "User hierarchy updated.", "user": user })))
}

// ─── Suspension ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SuspendBody {
  pub reason: Option<String>,
  pub until:  Option<DateTime<Utc>>,
}

/// `PATCH /admin/users/{user}/suspend` — suspends the target and revokes
/// every one of its access tokens.
pub async fn suspend_user<S>(
  State(state): State<AppState<S>>,
  admin: AdminUser,
  Path(user_id): Path<Uuid>,
  Json(body): Json<SuspendBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let now = Utc::now();
  let mut errors = FieldErrors::new();
  if let Some(reason) = body.reason.as_deref() {
    validate::max_len(&mut errors, "reason", reason, 255);
  }
  if let Some(until) = body.until {
    validate::after_now(&mut errors, "until", until, now);
  }
  errors.into_result()?;

  let target = load_target(&state, user_id).await?;
  authz::check_self_preservation(
    admin.0.account.id,
    target.id,
    ProtectedAction::Suspend,
  )?;

  let suspended = state
    .store
    .suspend_account(target.id, body.until, body.reason, now)
    .await
    .map_err(|e| map_floor_error(e, "user"))?;

  let user = present::account_view(&*state.store, suspended).await?;
  Ok(Json(json!({ "message": "User suspended successfully.", "user": user })))
}

/// `PATCH /admin/users/{user}/reactivate` — unconditionally clears the
/// suspension fields.
pub async fn reactivate_user<S>(
  State(state): State<AppState<S>>,
  _admin: AdminUser,
  Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  load_target(&state, user_id).await?;
  let account = state
    .store
    .clear_suspension(user_id)
    .await
    .map_err(|e| map_floor_error(e, "user"))?;

  let user = present::account_view(&*state.store, account).await?;
  Ok(Json(json!({ "message": "User reactivated successfully.", "user": user })))
}

// ─── Deletion ────────────────────────────────────────────────────────────────

/// `DELETE /admin/users/{user}`
pub async fn destroy_user<S>(
  State(state): State<AppState<S>>,
  admin: AdminUser,
  Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let target = load_target(&state, user_id).await?;
  authz::check_self_preservation(
    admin.0.account.id,
    target.id,
    ProtectedAction::Delete,
  )?;

  state
    .store
    .delete_account(target.id, Utc::now())
    .await
    .map_err(|e| map_floor_error(e, "user"))?;

  Ok(Json(json!({ "message": "User deleted successfully." })))
}

// ─── Announcements ───────────────────────────────────────────────────────────

/// `GET /admin/announcements` — newest 100, regardless of state.
pub async fn announcements<S>(
  State(state): State<AppState<S>>,
  _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let announcements = state.store.list_announcements(100).await?;
  Ok(Json(
    present::announcement_views(&*state.store, announcements).await?,
  ))
}

#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementBody {
  pub title:                Option<String>,
  pub message:              Option<String>,
  #[serde(rename = "type")]
  pub kind:                 Option<String>,
  pub target_scope:         Option<String>,
  pub target_role:          Option<String>,
  pub target_department_id: Option<Uuid>,
  pub is_pinned:            Option<bool>,
  pub is_active:            Option<bool>,
  pub starts_at:            Option<DateTime<Utc>>,
  pub ends_at:              Option<DateTime<Utc>>,
}

/// `POST /admin/announcements` — the target field matching the scope is
/// required; the others are nulled.
pub async fn create_announcement<S>(
  State(state): State<AppState<S>>,
  admin: AdminUser,
  Json(body): Json<CreateAnnouncementBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let mut errors = FieldErrors::new();
  let title = validate::require(&mut errors, "title", body.title.as_deref());
  if let Some(title) = title {
    validate::max_len(&mut errors, "title", title, 140);
  }
  let message = validate::require(&mut errors, "message", body.message.as_deref());
  if let Some(message) = message {
    validate::max_len(&mut errors, "message", message, 3000);
  }
  let kind = match body.kind.as_deref() {
    Some(s) => match AnnouncementKind::parse(s) {
      Ok(kind) => Some(kind),
      Err(_) => {
        errors.push("type", "The selected type is invalid.");
        None
      }
    },
    None => {
      errors.push("type", "The type field is required.");
      None
    }
  };
  let scope = match body.target_scope.as_deref() {
    Some(s) => match TargetScope::parse(s) {
      Ok(scope) => Some(scope),
      Err(_) => {
        errors.push("target_scope", "The selected target_scope is invalid.");
        None
      }
    },
    None => {
      errors.push("target_scope", "The target_scope field is required.");
      None
    }
  };
  if let Some(role) = body.target_role.as_deref() {
    validate::max_len(&mut errors, "target_role", role, 100);
  }
  validate::window_ordered(&mut errors, "ends_at", body.starts_at, body.ends_at);
  errors.into_result()?;

  let (kind, scope) = (kind.unwrap_or(AnnouncementKind::Info), scope.unwrap_or(TargetScope::All));

  // Scope normalisation: require the matching target, null the rest.
  let target_role = match scope {
    TargetScope::Role => Some(
      body
        .target_role
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| {
          ApiError::validation(
            "target_role",
            "target_role is required when target_scope is role.",
          )
        })?,
    ),
    _ => None,
  };
  let target_department_id = match scope {
    TargetScope::Department => {
      let id = body.target_department_id.ok_or_else(|| {
        ApiError::validation(
          "target_department_id",
          "target_department_id is required when target_scope is department.",
        )
      })?;
      if state.store.get_department(id).await?.is_none() {
        return Err(ApiError::validation(
          "target_department_id",
          "The selected target_department_id is invalid.",
        ));
      }
      Some(id)
    }
    _ => None,
  };

  let announcement = state
    .store
    .create_announcement(NewAnnouncement {
      title: title.unwrap_or_default().to_string(),
      message: message.unwrap_or_default().to_string(),
      kind,
      target_scope: scope,
      target_role,
      target_department_id,
      is_pinned: body.is_pinned.unwrap_or(false),
      is_active: body.is_active.unwrap_or(false),
      starts_at: body.starts_at,
      ends_at: body.ends_at,
      created_by: admin.0.account.id,
    })
    .await?;

  let view = present::announcement_view(&*state.store, announcement).await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({ "message": "Announcement posted.", "announcement": view })),
  ))
}

/// `DELETE /admin/announcements/{announcement}`
pub async fn delete_announcement<S>(
  State(state): State<AppState<S>>,
  _admin: AdminUser,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  state.store.delete_announcement(id).await.map_err(|e| match e {
    CoreError::AnnouncementNotFound(_) => {
      ApiError::NotFound("Announcement not found.".to_string())
    }
    other => ApiError::Store(other),
  })?;
  Ok(Json(json!({ "message": "Announcement deleted." })))
}

// ─── Themes ──────────────────────────────────────────────────────────────────

/// `GET /admin/themes` — newest 50.
pub async fn themes<S>(
  State(state): State<AppState<S>>,
  _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let themes = state.store.list_themes(50).await?;
  Ok(Json(present::theme_views(&*state.store, themes).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateThemeBody {
  pub name:           Option<String>,
  pub tagline:        Option<String>,
  pub banner_message: Option<String>,
  pub primary_color:  Option<String>,
  pub accent_color:   Option<String>,
  pub surface_color:  Option<String>,
  pub is_active:      Option<bool>,
  pub starts_at:      Option<DateTime<Utc>>,
  pub ends_at:        Option<DateTime<Utc>>,
  pub meta:           Option<serde_json::Value>,
}

/// `POST /admin/themes` — creating an active theme deactivates all others.
pub async fn create_theme<S>(
  State(state): State<AppState<S>>,
  admin: AdminUser,
  Json(body): Json<CreateThemeBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let mut errors = FieldErrors::new();
  let name = validate::require(&mut errors, "name", body.name.as_deref());
  if let Some(name) = name {
    validate::max_len(&mut errors, "name", name, 120);
  }
  if let Some(tagline) = body.tagline.as_deref() {
    validate::max_len(&mut errors, "tagline", tagline, 255);
  }
  if let Some(banner) = body.banner_message.as_deref() {
    validate::max_len(&mut errors, "banner_message", banner, 255);
  }
  for (field, value) in [
    ("primary_color", body.primary_color.as_deref()),
    ("accent_color", body.accent_color.as_deref()),
    ("surface_color", body.surface_color.as_deref()),
  ] {
    if let Some(color) = validate::require(&mut errors, field, value) {
      validate::hex_color(&mut errors, field, color);
    }
  }
  if let Some(meta) = &body.meta
    && !meta.is_object()
  {
    errors.push("meta", "The meta must be an object.");
  }
  validate::window_ordered(&mut errors, "ends_at", body.starts_at, body.ends_at);
  errors.into_result()?;

  let theme = state
    .store
    .create_theme(NewTheme {
      name: name.unwrap_or_default().to_string(),
      tagline: body.tagline,
      banner_message: body.banner_message,
      primary_color: body.primary_color.unwrap_or_default(),
      accent_color: body.accent_color.unwrap_or_default(),
      surface_color: body.surface_color.unwrap_or_default(),
      is_active: body.is_active.unwrap_or(false),
      starts_at: body.starts_at,
      ends_at: body.ends_at,
      meta: body.meta,
      created_by: admin.0.account.id,
    })
    .await?;

  let view = present::theme_view(&*state.store, theme).await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({ "message": "Theme created successfully.", "theme": view })),
  ))
}

/// `PATCH /admin/themes/{theme}/activate` — exactly one theme ends up
/// active; repeating the call is idempotent.
pub async fn activate_theme<S>(
  State(state): State<AppState<S>>,
  _admin: AdminUser,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let theme = state.store.activate_theme(id, Utc::now()).await.map_err(|e| {
    match e {
      CoreError::ThemeNotFound(_) => {
        ApiError::NotFound("Theme not found.".to_string())
      }
      other => ApiError::Store(other),
    }
  })?;

  let view = present::theme_view(&*state.store, theme).await?;
  Ok(Json(json!({ "message": "Theme activated successfully.", "theme": view })))
}
