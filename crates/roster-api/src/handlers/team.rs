//! Team visibility and the manager → subordinate mappings.

use axum::{
  Json,
  extract::{Path, Query, State},
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use roster_core::{
  authz::{self, EdgeManager, TeamScope},
  store::{AccountQuery, DirectoryStore},
};

use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  present,
};

// ─── Listing ─────────────────────────────────────────────────────────────────

/// `GET /team/users` — scoped per the caller's role: admins see everyone,
/// managers see themselves plus their subordinates, everyone else sees
/// themselves.
pub async fn users<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let accounts = match authz::team_scope(&user.roles) {
    TeamScope::All => {
      state
        .store
        .list_accounts(AccountQuery::default(), chrono::Utc::now())
        .await?
    }
    TeamScope::ManagerOwn => {
      let mut ids = state.store.subordinate_ids(user.account.id).await?;
      ids.push(user.account.id);
      state.store.get_accounts(ids).await?
    }
    TeamScope::SelfOnly => vec![user.account.clone()],
  };

  Ok(Json(present::account_views(&*state.store, accounts).await?))
}

#[derive(Debug, Deserialize)]
pub struct SubordinateListQuery {
  pub manager_id: Option<Uuid>,
}

/// `GET /team/subordinates` — admins get the full edge list (optionally
/// filtered by manager); managers get their own subordinates as accounts.
pub async fn subordinates<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Query(query): Query<SubordinateListQuery>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let actor = user.actor();

  if actor.is_admin() {
    if let Some(manager_id) = query.manager_id
      && state.store.get_account(manager_id).await?.is_none()
    {
      return Err(ApiError::validation(
        "manager_id",
        "The selected manager_id is invalid.",
      ));
    }
    let edges = state.store.list_edges(query.manager_id).await?;
    let mut views = Vec::with_capacity(edges.len());
    for edge in edges {
      views.push(present::edge_view(&*state.store, edge).await?);
    }
    return Ok(Json(serde_json::to_value(views).map_err(roster_core::Error::from)?));
  }

  if !actor.is_manager() {
    return Err(ApiError::Forbidden("Forbidden".to_string()));
  }

  let ids = state.store.subordinate_ids(actor.id).await?;
  let accounts = state.store.get_accounts(ids).await?;
  let views = present::account_views(&*state.store, accounts).await?;
  Ok(Json(serde_json::to_value(views).map_err(roster_core::Error::from)?))
}

// ─── Mutations ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignSubordinateBody {
  pub subordinate_id: Option<Uuid>,
  pub manager_id:     Option<Uuid>,
}

/// `POST /team/subordinates` — record an edge. Re-adding an existing pair
/// is a no-op success.
pub async fn assign_subordinate<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<AssignSubordinateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let subordinate_id = body.subordinate_id.ok_or_else(|| {
    ApiError::validation("subordinate_id", "The subordinate_id field is required.")
  })?;

  let actor = user.actor();
  let manager_id =
    resolve_manager(&state, &actor, body.manager_id).await?;

  let subordinate = state
    .store
    .get_account(subordinate_id)
    .await?
    .ok_or_else(|| {
      ApiError::validation("subordinate_id", "The selected subordinate_id is invalid.")
    })?;
  let subordinate_roles = state.store.roles_of(subordinate.id).await?;
  authz::check_subordinate_eligible(manager_id, subordinate.id, &subordinate_roles)?;

  state.store.add_edge(manager_id, subordinate.id).await?;

  Ok(Json(json!({ "message": "Subordinate assigned successfully." })))
}

#[derive(Debug, Deserialize)]
pub struct RemoveSubordinateQuery {
  pub manager_id: Option<Uuid>,
}

/// `DELETE /team/subordinates/{subordinate}` — removing a non-existent
/// edge succeeds silently. `manager_id` travels as a query parameter.
pub async fn remove_subordinate<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(subordinate_id): Path<Uuid>,
  Query(query): Query<RemoveSubordinateQuery>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let actor = user.actor();
  let manager_id = resolve_manager(&state, &actor, query.manager_id).await?;

  state.store.remove_edge(manager_id, subordinate_id).await?;

  Ok(Json(json!({ "message": "Subordinate removed successfully." })))
}

/// Load the facts [`authz::resolve_edge_manager`] needs and run it.
async fn resolve_manager<S>(
  state:     &AppState<S>,
  actor:     &roster_core::authz::Actor,
  requested: Option<Uuid>,
) -> Result<Uuid, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let loaded = match requested.filter(|_| actor.is_admin()) {
    Some(id) => match state.store.get_account(id).await? {
      Some(account) => {
        let roles = state.store.roles_of(account.id).await?;
        Some(EdgeManager { id: account.id, roles })
      }
      None => None,
    },
    None => None,
  };

  Ok(authz::resolve_edge_manager(actor, requested, loaded.as_ref())?)
}
