//! The non-admin system surface: departments, the active-announcement
//! feed, and the active theme.

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;

use roster_core::{broadcast, store::DirectoryStore};

use crate::{AppState, auth::CurrentUser, error::ApiError, present};

/// Feed length for `GET /system/announcements`.
const FEED_LIMIT: usize = 20;

/// `GET /departments` — public; registration needs the list before any
/// account exists.
pub async fn departments<S>(
  State(state): State<AppState<S>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.list_departments().await?))
}

/// `GET /system/announcements` — currently active broadcasts whose scope
/// matches the caller, pinned first, newest first.
pub async fn active_announcements<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let announcements = state
    .store
    .list_active_announcements(Utc::now())
    .await?
    .into_iter()
    .filter(|a| {
      broadcast::announcement_targets(a, &user.roles, user.account.department_id)
    })
    .take(FEED_LIMIT)
    .collect();

  Ok(Json(
    present::announcement_views(&*state.store, announcements).await?,
  ))
}

/// `GET /system/theme` — the single active theme, or `null`.
pub async fn active_theme<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.active_theme(Utc::now()).await?))
}
