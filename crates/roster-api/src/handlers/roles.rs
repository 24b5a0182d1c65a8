//! Generic role management (admin-only surface).
//!
//! Roles are a closed set, so assignment and removal take a role name;
//! granting simply inserts the membership row if absent. Removing `admin`
//! runs through the same self-protection and floor checks as the primary
//! role sync.

use axum::{
  Json,
  extract::{Path, State},
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use roster_core::{
  authz::{self, ProtectedAction},
  role::{MANAGED_ROLES, Role},
  store::{AccountQuery, DirectoryStore},
};

use crate::{
  AppState,
  auth::AdminUser,
  error::ApiError,
  handlers::admin::map_floor_error,
  present,
};

/// `GET /roles` — the managed role names.
pub async fn index<S>(
  State(_state): State<AppState<S>>,
  _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let names: Vec<&'static str> =
    MANAGED_ROLES.iter().map(|r| r.as_str()).collect();
  Ok(Json(names))
}

/// `GET /roles/users` — every account with its role set.
pub async fn users_with_roles<S>(
  State(state): State<AppState<S>>,
  _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let accounts = state
    .store
    .list_accounts(AccountQuery::default(), Utc::now())
    .await?;
  Ok(Json(present::account_views(&*state.store, accounts).await?))
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
  pub role: Option<String>,
}

fn parse_role(body: &RoleBody) -> Result<Role, ApiError> {
  let name = body
    .role
    .as_deref()
    .ok_or_else(|| ApiError::validation("role", "The role field is required."))?;
  Role::parse(name)
    .map_err(|_| ApiError::validation("role", "The selected role is invalid."))
}

/// `POST /roles/assign/{user}` — a no-op if the role is already held.
pub async fn assign_role<S>(
  State(state): State<AppState<S>>,
  _admin: AdminUser,
  Path(user_id): Path<Uuid>,
  Json(body): Json<RoleBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let role = parse_role(&body)?;
  if state.store.get_account(user_id).await?.is_none() {
    return Err(ApiError::NotFound("User not found.".to_string()));
  }

  state.store.grant_role(user_id, role).await?;
  Ok(Json(json!({ "message": "Role assigned successfully" })))
}

/// `POST /roles/remove/{user}` — removing `admin` is subject to the
/// self-protection and last-active-admin rules.
pub async fn remove_role<S>(
  State(state): State<AppState<S>>,
  admin: AdminUser,
  Path(user_id): Path<Uuid>,
  Json(body): Json<RoleBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let role = parse_role(&body)?;
  if state.store.get_account(user_id).await?.is_none() {
    return Err(ApiError::NotFound("User not found.".to_string()));
  }

  if role == Role::Admin {
    authz::check_self_preservation(
      admin.0.account.id,
      user_id,
      ProtectedAction::DowngradeRole,
    )?;
  }

  state
    .store
    .revoke_role(user_id, role, Utc::now())
    .await
    .map_err(|e| map_floor_error(e, "role"))?;

  Ok(Json(json!({ "message": "Role removed successfully" })))
}
