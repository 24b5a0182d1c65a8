//! HTTP JSON API for the Roster directory.
//!
//! Exposes an axum [`Router`] backed by any
//! [`DirectoryStore`](roster_core::store::DirectoryStore). Every
//! authenticated route passes through the suspension gate in
//! [`auth::CurrentUser`]; the `/admin` and `/roles` surfaces additionally
//! require the `admin` role via [`auth::AdminUser`].

pub mod auth;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod present;
pub mod validate;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, patch, post},
};
use roster_core::store::DirectoryStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use mailer::ResetMailer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Seeded at startup when no active admin exists; without it the server
  /// still runs but the hard invariant starts unsatisfied.
  pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Deserialize, Clone)]
pub struct BootstrapAdmin {
  pub name:     String,
  pub email:    String,
  pub password: String,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: DirectoryStore> {
  pub store:  Arc<S>,
  pub mailer: Arc<dyn ResetMailer>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the Roster API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Public
    .route("/departments",          get(handlers::system::departments::<S>))
    .route("/register",             post(handlers::auth::register::<S>))
    .route("/login",                post(handlers::auth::login::<S>))
    .route("/auth/forgot-password", post(handlers::auth::forgot_password::<S>))
    .route("/auth/reset-password",  post(handlers::auth::reset_password::<S>))
    // Authenticated
    .route("/me",     get(handlers::auth::me::<S>))
    .route("/logout", post(handlers::auth::logout::<S>))
    .route(
      "/team/users",
      get(handlers::team::users::<S>),
    )
    .route(
      "/team/subordinates",
      get(handlers::team::subordinates::<S>)
        .post(handlers::team::assign_subordinate::<S>),
    )
    .route(
      "/team/subordinates/{subordinate}",
      delete(handlers::team::remove_subordinate::<S>),
    )
    .route(
      "/tasks",
      get(handlers::tasks::index::<S>).post(handlers::tasks::create::<S>),
    )
    .route(
      "/tasks/{task}",
      get(handlers::tasks::show::<S>)
        .patch(handlers::tasks::update::<S>)
        .put(handlers::tasks::update::<S>)
        .delete(handlers::tasks::destroy::<S>),
    )
    .route(
      "/system/announcements",
      get(handlers::system::active_announcements::<S>),
    )
    .route("/system/theme", get(handlers::system::active_theme::<S>))
    // Admin-only
    .route("/admin/summary", get(handlers::admin::summary::<S>))
    .route(
      "/admin/users",
      get(handlers::admin::users::<S>).post(handlers::admin::create_user::<S>),
    )
    .route(
      "/admin/users/{user}/role",
      patch(handlers::admin::update_user_role::<S>),
    )
    .route(
      "/admin/users/{user}/suspend",
      patch(handlers::admin::suspend_user::<S>),
    )
    .route(
      "/admin/users/{user}/reactivate",
      patch(handlers::admin::reactivate_user::<S>),
    )
    .route("/admin/users/{user}", delete(handlers::admin::destroy_user::<S>))
    .route(
      "/admin/announcements",
      get(handlers::admin::announcements::<S>)
        .post(handlers::admin::create_announcement::<S>),
    )
    .route(
      "/admin/announcements/{announcement}",
      delete(handlers::admin::delete_announcement::<S>),
    )
    .route(
      "/admin/themes",
      get(handlers::admin::themes::<S>).post(handlers::admin::create_theme::<S>),
    )
    .route(
      "/admin/themes/{theme}/activate",
      patch(handlers::admin::activate_theme::<S>),
    )
    .route("/roles",       get(handlers::roles::index::<S>))
    .route("/roles/users", get(handlers::roles::users_with_roles::<S>))
    .route("/roles/assign/{user}", post(handlers::roles::assign_role::<S>))
    .route("/roles/remove/{user}", post(handlers::roles::remove_role::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
