//! Bearer-token auth: credential hashing, token issue/verify, and the
//! request extractors.
//!
//! Tokens are opaque per-session secrets: 32 random bytes, URL-safe base64
//! on the wire, stored only as a SHA-256 hex digest. The [`CurrentUser`]
//! extractor is also the suspension gate — every authenticated request
//! passes through it before any handler runs.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::Utc;
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

use roster_core::{
  account::{Account, Department},
  authz::Actor,
  role::{Role, RoleSet},
  store::DirectoryStore,
  suspension,
};

use crate::{AppState, error::ApiError};

/// Reset tokens outlive their welcome after an hour.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

// ─── Credential helpers ──────────────────────────────────────────────────────

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| {
      ApiError::Store(roster_core::Error::Backend(format!("argon2 error: {e}")))
    })
}

pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else { return false };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

/// Mint a fresh opaque token: `(plaintext, at-rest digest)`.
pub fn generate_token() -> (String, String) {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  let plaintext = B64.encode(bytes);
  let digest = hash_token(&plaintext);
  (plaintext, digest)
}

pub fn hash_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// The authenticated caller, with roles and department loaded eagerly so
/// every downstream decision works against in-memory state.
pub struct CurrentUser {
  pub account:    Account,
  pub roles:      RoleSet,
  pub department: Option<Department>,
  /// The session row behind the presented token; `POST /logout` revokes
  /// exactly this one.
  pub token_id:   Uuid,
}

impl CurrentUser {
  pub fn actor(&self) -> Actor {
    Actor { id: self.account.id, roles: self.roles.clone() }
  }
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = parts
      .headers
      .get(axum::http::header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix("Bearer "))
      .ok_or(ApiError::Unauthenticated)?;

    let access = state
      .store
      .find_access_token(hash_token(token))
      .await?
      .ok_or(ApiError::Unauthenticated)?;

    let mut account = state
      .store
      .get_account(access.account_id)
      .await?
      .ok_or(ApiError::Unauthenticated)?;

    let now = Utc::now();
    if suspension::is_currently_suspended(&account, now) {
      // Rejection revokes the presented credential.
      state.store.delete_access_token(access.id).await?;
      return Err(ApiError::Locked {
        message:         suspension::suspension_message(&account),
        suspended_until: account.suspended_until,
      });
    }
    if suspension::normalize_if_expired(&mut account, now) {
      account = state.store.clear_suspension(account.id).await?;
    }

    let roles = state.store.roles_of(account.id).await?;
    let department = match account.department_id {
      Some(id) => state.store.get_department(id).await?,
      None => None,
    };

    Ok(CurrentUser { account, roles, department, token_id: access.id })
  }
}

/// Role gate for the `/admin` and `/roles` surface.
pub struct AdminUser(pub CurrentUser);

impl<S> FromRequestParts<AppState<S>> for AdminUser
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let user = CurrentUser::from_request_parts(parts, state).await?;
    if !user.roles.has(Role::Admin) {
      return Err(ApiError::Forbidden("Forbidden".to_string()));
    }
    Ok(AdminUser(user))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn password_hash_round_trip() {
    let phc = hash_password("secret123").unwrap();
    assert!(phc.starts_with("$argon2"));
    assert!(verify_password("secret123", &phc));
    assert!(!verify_password("wrong", &phc));
  }

  #[test]
  fn verify_rejects_malformed_hashes() {
    assert!(!verify_password("anything", "not-a-phc-string"));
  }

  #[test]
  fn tokens_are_unique_and_digests_are_stable() {
    let (plain_a, digest_a) = generate_token();
    let (plain_b, digest_b) = generate_token();
    assert_ne!(plain_a, plain_b);
    assert_ne!(digest_a, digest_b);
    assert_eq!(hash_token(&plain_a), digest_a);
    // Digest is hex-encoded SHA-256.
    assert_eq!(digest_a.len(), 64);
  }
}
