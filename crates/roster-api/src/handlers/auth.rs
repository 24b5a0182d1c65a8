//! Registration, login, logout, `/me`, and the password-reset flow.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use roster_core::{
  Error as CoreError,
  account::NewAccount,
  role::registration_roles,
  store::DirectoryStore,
  suspension,
};

use crate::{
  AppState,
  auth::{
    self as credentials, CurrentUser, RESET_TOKEN_TTL_MINUTES, hash_token,
  },
  error::{ApiError, FieldErrors},
  present,
  validate,
};

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub name:                  Option<String>,
  pub email:                 Option<String>,
  pub department_id:         Option<Uuid>,
  pub password:              Option<String>,
  pub password_confirmation: Option<String>,
}

/// `POST /register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterBody>,
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
    validate::confirmed(
      &mut errors,
      "password",
      password,
      body.password_confirmation.as_deref(),
    );
  }
  errors.into_result()?;

  let (name, email, password) = (
    name.unwrap_or_default().to_string(),
    email.unwrap_or_default().to_string(),
    password.unwrap_or_default(),
  );
  let department_id = body.department_id.unwrap_or_default();

  let department = state
    .store
    .get_department(department_id)
    .await?
    .ok_or_else(|| {
      ApiError::validation("department_id", "The selected department_id is invalid.")
    })?;

  let account = state
    .store
    .create_account(NewAccount {
      name,
      email,
      password_hash: credentials::hash_password(password)?,
      department_id: department.id,
    })
    .await
    .map_err(map_account_creation_error)?;

  for role in registration_roles(&department.name) {
    state.store.grant_role(account.id, role).await?;
  }

  let (token, digest) = credentials::generate_token();
  state.store.insert_access_token(account.id, digest).await?;

  let user = present::account_view(&*state.store, account).await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({
      "message": "User registered successfully",
      "token": token,
      "user": user,
    })),
  ))
}

pub(crate) fn map_account_creation_error(err: CoreError) -> ApiError {
  match err {
    CoreError::NameTaken(_) => {
      ApiError::validation("name", "The name has already been taken.")
    }
    CoreError::EmailTaken(_) => {
      ApiError::validation("email", "The email has already been taken.")
    }
    CoreError::DepartmentNotFound(_) => ApiError::validation(
      "department_id",
      "The selected department_id is invalid.",
    ),
    other => ApiError::Store(other),
  }
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub name:     Option<String>,
  pub email:    Option<String>,
  pub password: Option<String>,
}

/// `POST /login` — name, email, and password must all match one account.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let mut errors = FieldErrors::new();
  let name = validate::require(&mut errors, "name", body.name.as_deref());
  let email = validate::require(&mut errors, "email", body.email.as_deref());
  if let Some(email) = email {
    validate::email_shape(&mut errors, "email", email);
  }
  let password =
    validate::require(&mut errors, "password", body.password.as_deref());
  errors.into_result()?;

  let (name, email, password) = (
    name.unwrap_or_default(),
    email.unwrap_or_default(),
    password.unwrap_or_default(),
  );

  let account = state
    .store
    .find_account_by_name_email(name.to_string(), email.to_string())
    .await?;

  let mut account = match account {
    Some(a) if credentials::verify_password(password, &a.password_hash) => a,
    _ => {
      let mut errors = FieldErrors::new();
      errors.push("name", "The provided credentials are incorrect.");
      errors.push("email", "The provided credentials are incorrect.");
      return Err(ApiError::Validation(errors));
    }
  };

  let now = Utc::now();
  if suspension::is_currently_suspended(&account, now) {
    return Err(ApiError::Locked {
      message:         suspension::suspension_message(&account),
      suspended_until: account.suspended_until,
    });
  }
  if suspension::normalize_if_expired(&mut account, now) {
    account = state.store.clear_suspension(account.id).await?;
  }

  let (token, digest) = credentials::generate_token();
  state.store.insert_access_token(account.id, digest).await?;

  let user = present::account_view(&*state.store, account).await?;
  Ok(Json(json!({
    "message": "Login successful",
    "token": token,
    "user": user,
  })))
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// `GET /me`
pub async fn me<S>(
  State(_state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let CurrentUser { account, roles, department, .. } = user;
  Ok(Json(present::account_view_from_parts(account, &roles, department)))
}

/// `POST /logout` — revokes only the presented token.
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  state.store.delete_access_token(user.token_id).await?;
  Ok(Json(json!({ "message": "Logged out successfully" })))
}

// ─── Password reset ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordBody {
  pub email: Option<String>,
}

/// `POST /auth/forgot-password` — always 200; no account enumeration.
pub async fn forgot_password<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<ForgotPasswordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let mut errors = FieldErrors::new();
  let email = validate::require(&mut errors, "email", body.email.as_deref());
  if let Some(email) = email {
    validate::email_shape(&mut errors, "email", email);
  }
  errors.into_result()?;
  let email = email.unwrap_or_default();

  if let Some(account) = state
    .store
    .find_account_by_email(email.to_string())
    .await?
  {
    let (token, digest) = credentials::generate_token();
    state
      .store
      .upsert_reset_token(account.email.clone(), digest, Utc::now())
      .await?;
    state.mailer.send_reset(&account.email, &token);
  }

  Ok(Json(json!({
    "message": "If that email address exists, a reset link has been sent.",
  })))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordBody {
  pub email:                 Option<String>,
  pub token:                 Option<String>,
  pub password:              Option<String>,
  pub password_confirmation: Option<String>,
}

/// `POST /auth/reset-password`
pub async fn reset_password<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<ResetPasswordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  let mut errors = FieldErrors::new();
  let email = validate::require(&mut errors, "email", body.email.as_deref());
  if let Some(email) = email {
    validate::email_shape(&mut errors, "email", email);
  }
  let token = validate::require(&mut errors, "token", body.token.as_deref());
  let password =
    validate::require(&mut errors, "password", body.password.as_deref());
  if let Some(password) = password {
    validate::min_len(&mut errors, "password", password, 8);
    validate::confirmed(
      &mut errors,
      "password",
      password,
      body.password_confirmation.as_deref(),
    );
  }
  errors.into_result()?;

  let email = email.unwrap_or_default();
  let token = token.unwrap_or_default();
  let password = password.unwrap_or_default();

  let reset = state.store.find_reset_token(email.to_string()).await?;
  let fresh_until = Utc::now() - Duration::minutes(RESET_TOKEN_TTL_MINUTES);
  let valid = reset
    .as_ref()
    .is_some_and(|r| r.token_hash == hash_token(token) && r.created_at > fresh_until);
  if !valid {
    return Err(ApiError::validation(
      "token",
      "This password reset token is invalid or has expired.",
    ));
  }

  state
    .store
    .set_password_by_email(email.to_string(), credentials::hash_password(password)?)
    .await?;
  state.store.delete_reset_token(email.to_string()).await?;

  Ok(Json(json!({ "message": "Password has been reset successfully" })))
}
