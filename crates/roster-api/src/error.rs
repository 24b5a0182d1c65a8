//! API error type, the field-scoped validation map, and the
//! [`axum::response::IntoResponse`] implementation producing the wire
//! envelopes.

use std::collections::BTreeMap;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use roster_core::authz::Deny;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

// ─── Field errors ────────────────────────────────────────────────────────────

/// Accumulated validation failures, keyed by input field.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
  pub fn new() -> Self { Self::default() }

  pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.entry(field.into()).or_default().push(message.into());
  }

  pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
    let mut errors = Self::new();
    errors.push(field, message);
    errors
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// First message, used as the envelope's top-level `message`.
  fn headline(&self) -> String {
    self
      .0
      .values()
      .flatten()
      .next()
      .cloned()
      .unwrap_or_else(|| "The given data was invalid.".to_string())
  }

  /// Bail out of a handler if anything accumulated.
  pub fn into_result(self) -> Result<(), ApiError> {
    if self.is_empty() { Ok(()) } else { Err(ApiError::Validation(self)) }
  }
}

// ─── Error type ──────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthenticated")]
  Unauthenticated,

  #[error("forbidden: {0}")]
  Forbidden(String),

  /// 423 — authenticated but currently suspended.
  #[error("account locked: {message}")]
  Locked {
    message:         String,
    suspended_until: Option<DateTime<Utc>>,
  },

  #[error("validation failed")]
  Validation(FieldErrors),

  #[error("not found: {0}")]
  NotFound(String),

  /// Uncategorised store failure; rendered as a bare 500.
  #[error("store error: {0}")]
  Store(#[from] roster_core::Error),
}

impl ApiError {
  pub fn validation(
    field:   impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    ApiError::Validation(FieldErrors::single(field, message))
  }
}

impl From<Deny> for ApiError {
  fn from(deny: Deny) -> Self {
    match deny {
      Deny::Forbidden(message) => ApiError::Forbidden(message),
      Deny::Invalid { field, message } => ApiError::validation(field, message),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Unauthenticated => (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Unauthenticated." })),
      )
        .into_response(),
      ApiError::Forbidden(message) => {
        (StatusCode::FORBIDDEN, Json(json!({ "message": message })))
          .into_response()
      }
      ApiError::Locked { message, suspended_until } => (
        StatusCode::LOCKED,
        Json(json!({
          "message": message,
          "suspended_until": suspended_until.map(|t| t.to_rfc3339()),
        })),
      )
        .into_response(),
      ApiError::Validation(errors) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "message": errors.headline(), "errors": errors })),
      )
        .into_response(),
      ApiError::NotFound(message) => {
        (StatusCode::NOT_FOUND, Json(json!({ "message": message })))
          .into_response()
      }
      ApiError::Store(err) => {
        tracing::error!(error = %err, "unhandled store error");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "message": "Server error." })),
        )
          .into_response()
      }
    }
  }
}
