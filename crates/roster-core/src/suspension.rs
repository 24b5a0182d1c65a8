//! The account suspension lifecycle.
//!
//! Two states: Active and Suspended(until?, reason?). Expiry is lazy — a
//! record whose `suspended_until` has passed still reads `is_suspended =
//! true` until a checkpoint (authenticated request or login) normalises it.
//! These predicates are the only place the rules live; callers never
//! inspect the raw fields directly.

use chrono::{DateTime, Utc};

use crate::account::Account;

/// The authoritative suspension predicate: suspended with no expiry, or
/// suspended with the expiry still in the future.
pub fn is_currently_suspended(account: &Account, now: DateTime<Utc>) -> bool {
  if !account.is_suspended {
    return false;
  }
  match account.suspended_until {
    None => true,
    Some(until) => until > now,
  }
}

/// Clear an expired suspension in place. Returns `true` if the record
/// changed and must be persisted by the caller.
pub fn normalize_if_expired(account: &mut Account, now: DateTime<Utc>) -> bool {
  let expired = account.is_suspended
    && account.suspended_until.is_some_and(|until| until <= now);

  if expired {
    account.is_suspended = false;
    account.suspended_until = None;
    account.suspension_reason = None;
  }
  expired
}

/// The human-facing lock message carried by 423 responses.
pub fn suspension_message(account: &Account) -> String {
  match account.suspended_until {
    Some(until) => format!(
      "Your account is suspended until {}.",
      until.format("%a, %b %-d, %Y %H:%M UTC")
    ),
    None => "Your account is suspended. Contact an administrator.".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use uuid::Uuid;

  use super::*;

  fn account(
    is_suspended: bool,
    until: Option<DateTime<Utc>>,
  ) -> Account {
    let now = Utc::now();
    Account {
      id:                Uuid::new_v4(),
      name:              "t".into(),
      email:             "t@example.com".into(),
      password_hash:     String::new(),
      department_id:     None,
      is_suspended,
      suspended_until:   until,
      suspension_reason: is_suspended.then(|| "test".to_string()),
      created_at:        now,
      updated_at:        now,
    }
  }

  #[test]
  fn not_suspended_is_active() {
    let now = Utc::now();
    assert!(!is_currently_suspended(&account(false, None), now));
  }

  #[test]
  fn indefinite_suspension_is_active_suspended() {
    let now = Utc::now();
    assert!(is_currently_suspended(&account(true, None), now));
  }

  #[test]
  fn future_until_is_active_suspended() {
    let now = Utc::now();
    let acct = account(true, Some(now + Duration::days(3)));
    assert!(is_currently_suspended(&acct, now));
  }

  #[test]
  fn past_until_is_lazily_active_again() {
    let now = Utc::now();
    let acct = account(true, Some(now - Duration::hours(1)));
    // Pre-normalisation the raw flag still reads suspended…
    assert!(acct.is_suspended);
    // …but the authoritative predicate says active.
    assert!(!is_currently_suspended(&acct, now));
  }

  #[test]
  fn normalize_clears_only_expired_records() {
    let now = Utc::now();

    let mut expired = account(true, Some(now - Duration::minutes(5)));
    assert!(normalize_if_expired(&mut expired, now));
    assert!(!expired.is_suspended);
    assert!(expired.suspended_until.is_none());
    assert!(expired.suspension_reason.is_none());

    let mut indefinite = account(true, None);
    assert!(!normalize_if_expired(&mut indefinite, now));
    assert!(indefinite.is_suspended);

    let mut future = account(true, Some(now + Duration::days(1)));
    assert!(!normalize_if_expired(&mut future, now));
    assert!(future.is_suspended);
  }

  #[test]
  fn message_mentions_expiry_when_present() {
    let now = Utc::now();
    let with_until = account(true, Some(now + Duration::days(1)));
    assert!(suspension_message(&with_until).contains("until"));
    let indefinite = account(true, None);
    assert!(suspension_message(&indefinite).contains("administrator"));
  }
}
