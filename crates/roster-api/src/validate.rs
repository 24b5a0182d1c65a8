//! Field validators accumulating into the 422 error map.
//!
//! Each helper mirrors one rule from the request validation tables; the
//! handler collects failures into a [`FieldErrors`] and bails before
//! touching the store.

use chrono::{DateTime, Utc};

use crate::error::FieldErrors;

/// Presence check; returns the trimmed value when present and non-empty.
pub fn require<'a>(
  errors: &mut FieldErrors,
  field:  &str,
  value:  Option<&'a str>,
) -> Option<&'a str> {
  match value.map(str::trim).filter(|v| !v.is_empty()) {
    Some(v) => Some(v),
    None => {
      errors.push(field, format!("The {field} field is required."));
      None
    }
  }
}

pub fn max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
  if value.chars().count() > max {
    errors.push(
      field,
      format!("The {field} may not be greater than {max} characters."),
    );
  }
}

pub fn min_len(errors: &mut FieldErrors, field: &str, value: &str, min: usize) {
  if value.chars().count() < min {
    errors.push(field, format!("The {field} must be at least {min} characters."));
  }
}

/// Shape check only; deliverability is the mailer's problem.
pub fn email_shape(errors: &mut FieldErrors, field: &str, value: &str) {
  let valid = match value.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
    }
    None => false,
  };
  if !valid {
    errors.push(field, format!("The {field} must be a valid email address."));
  }
}

pub fn confirmed(
  errors:       &mut FieldErrors,
  field:        &str,
  value:        &str,
  confirmation: Option<&str>,
) {
  if confirmation != Some(value) {
    errors.push(field, format!("The {field} confirmation does not match."));
  }
}

/// `#RRGGBB` only.
pub fn hex_color(errors: &mut FieldErrors, field: &str, value: &str) {
  let valid = value.len() == 7
    && value.starts_with('#')
    && value[1..].chars().all(|c| c.is_ascii_hexdigit());
  if !valid {
    errors.push(field, format!("The {field} format is invalid."));
  }
}

pub fn after_now(
  errors: &mut FieldErrors,
  field:  &str,
  value:  DateTime<Utc>,
  now:    DateTime<Utc>,
) {
  if value <= now {
    errors.push(field, format!("The {field} must be a date after now."));
  }
}

/// `ends_at` must follow `starts_at` when both are present.
pub fn window_ordered(
  errors:    &mut FieldErrors,
  field:     &str,
  starts_at: Option<DateTime<Utc>>,
  ends_at:   Option<DateTime<Utc>>,
) {
  if let (Some(start), Some(end)) = (starts_at, ends_at)
    && end <= start
  {
    errors.push(field, format!("The {field} must be a date after starts_at."));
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  #[test]
  fn require_trims_and_flags_missing() {
    let mut errors = FieldErrors::new();
    assert_eq!(require(&mut errors, "name", Some("  bob  ")), Some("bob"));
    assert!(errors.is_empty());

    assert_eq!(require(&mut errors, "name", Some("   ")), None);
    assert_eq!(require(&mut errors, "email", None), None);
    assert!(!errors.is_empty());
  }

  #[test]
  fn email_shape_accepts_plausible_addresses() {
    let mut errors = FieldErrors::new();
    email_shape(&mut errors, "email", "user@example.com");
    assert!(errors.is_empty());

    for bad in ["plain", "a@b", "a b@example.com", "a@.com", "@example.com"] {
      let mut errors = FieldErrors::new();
      email_shape(&mut errors, "email", bad);
      assert!(!errors.is_empty(), "accepted {bad:?}");
    }
  }

  #[test]
  fn hex_color_requires_rrggbb() {
    let mut errors = FieldErrors::new();
    hex_color(&mut errors, "primary_color", "#0f172a");
    assert!(errors.is_empty());

    for bad in ["0f172a", "#0f172", "#0f172g", "#0f172aa"] {
      let mut errors = FieldErrors::new();
      hex_color(&mut errors, "primary_color", bad);
      assert!(!errors.is_empty(), "accepted {bad:?}");
    }
  }

  #[test]
  fn window_ordering_only_applies_when_both_ends_set() {
    let now = Utc::now();
    let mut errors = FieldErrors::new();
    window_ordered(&mut errors, "ends_at", Some(now), Some(now + Duration::hours(1)));
    window_ordered(&mut errors, "ends_at", None, Some(now));
    window_ordered(&mut errors, "ends_at", Some(now), None);
    assert!(errors.is_empty());

    window_ordered(&mut errors, "ends_at", Some(now), Some(now));
    assert!(!errors.is_empty());
  }
}
