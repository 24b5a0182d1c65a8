//! Outbound-mail seam for the password-reset flow.
//!
//! Delivery itself is an external concern; the API only needs somewhere to
//! hand the reset token. Production deployments plug an SMTP-backed
//! implementation in here.

/// Collaborator that delivers a password-reset token to an address.
pub trait ResetMailer: Send + Sync {
  fn send_reset(&self, email: &str, token: &str);
}

/// Development mailer: records the delivery in the log instead of sending.
/// The token itself is only emitted at debug level.
pub struct LogMailer;

impl ResetMailer for LogMailer {
  fn send_reset(&self, email: &str, token: &str) {
    tracing::info!(email, "password reset requested");
    tracing::debug!(email, token, "password reset token");
  }
}
