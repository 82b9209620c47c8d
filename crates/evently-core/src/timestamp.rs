//! Creation-time normalisation.
//!
//! Event documents carry `createdAt` in whatever shape the writer or the
//! store produced: a store [`Timestamp`](crate::document::Timestamp), a
//! client-side date/time, a date string, or nothing at all while a
//! server-stamped write is still pending. Everything is reduced to epoch
//! milliseconds here; anything unrecognised becomes `None`, never an error.

use std::fmt::Write as _;

use chrono::{
  DateTime, Local, NaiveDate, NaiveDateTime, Utc,
  format::{Item, StrftimeItems},
};

use crate::{Error, Result, document::FieldValue};

/// Default rendering used by [`format`].
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset-less date-time layouts accepted by [`parse_millis`]; read as UTC.
const NAIVE_LAYOUTS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M",
];

/// Minute-precision layouts with an offset (`Z`, `+01:00`, `+0100`), which
/// RFC 3339 rejects for lacking seconds.
const OFFSET_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M%#z", "%Y-%m-%d %H:%M%#z"];

/// Epoch milliseconds for a recognised creation-time shape.
pub fn to_millis(value: &FieldValue) -> Option<i64> {
  match value {
    FieldValue::DateTime(dt) => Some(dt.timestamp_millis()),
    FieldValue::Timestamp(ts) => Some(ts.to_millis()),
    FieldValue::String(s) => parse_millis(s),
    _ => None,
  }
}

/// Same as [`to_millis`] for a field that may be missing entirely.
pub fn field_millis(value: Option<&FieldValue>) -> Option<i64> {
  value.and_then(to_millis)
}

/// Parse an ISO-8601-ish date string.
pub fn parse_millis(s: &str) -> Option<i64> {
  let s = s.trim();
  if s.is_empty() {
    return None;
  }

  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.timestamp_millis());
  }

  if let Some(dt) = OFFSET_LAYOUTS
    .iter()
    .find_map(|layout| DateTime::parse_from_str(s, layout).ok())
  {
    return Some(dt.timestamp_millis());
  }

  if let Some(naive) = NAIVE_LAYOUTS
    .iter()
    .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
  {
    return Some(naive.and_utc().timestamp_millis());
  }

  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc().timestamp_millis())
}

// ─── Formatting ──────────────────────────────────────────────────────────────

/// A validated `strftime` pattern.
///
/// chrono panics while rendering a pattern it cannot print, so user-supplied
/// patterns are checked once up front: every item must parse, and a sample
/// date must render. Parse-only specifiers such as `%#z` fail the second
/// check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat(String);

impl DateFormat {
  pub fn parse(pattern: &str) -> Result<Self> {
    let valid = !pattern.is_empty()
      && StrftimeItems::new(pattern).all(|item| !matches!(item, Item::Error))
      && write!(
        String::new(),
        "{}",
        Utc::now().with_timezone(&Local).format_with_items(StrftimeItems::new(pattern))
      )
      .is_ok();
    if valid {
      Ok(Self(pattern.to_owned()))
    } else {
      Err(Error::InvalidDateFormat(pattern.to_owned()))
    }
  }

  /// Render `value` in local time; `""` when it has no recognised timestamp.
  pub fn render(&self, value: Option<&FieldValue>) -> String {
    let Some(ms) = field_millis(value) else {
      return String::new();
    };
    match DateTime::<Utc>::from_timestamp_millis(ms) {
      Some(dt) => dt.with_timezone(&Local).format(&self.0).to_string(),
      // Out of chrono's range; still present, so never render blank.
      None => ms.to_string(),
    }
  }
}

impl Default for DateFormat {
  fn default() -> Self { Self(DEFAULT_DATE_FORMAT.to_owned()) }
}

/// Human-readable local rendering with [`DEFAULT_DATE_FORMAT`].
pub fn format(value: Option<&FieldValue>) -> String {
  DateFormat::default().render(value)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::document::Timestamp;

  const MS: i64 = 1_709_296_245_250; // 2024-03-01T12:30:45.250Z

  #[test]
  fn datetime_value() {
    let dt = DateTime::from_timestamp_millis(MS).unwrap();
    assert_eq!(to_millis(&FieldValue::DateTime(dt)), Some(MS));
  }

  #[test]
  fn store_timestamp_value() {
    let ts = Timestamp { seconds: MS / 1_000, nanos: 250_000_000 };
    assert_eq!(to_millis(&FieldValue::Timestamp(ts)), Some(MS));
  }

  #[test]
  fn iso_strings() {
    let cases = [
      "2024-03-01T12:30:45.250Z",
      "2024-03-01T13:30:45.250+01:00",
      "2024-03-01T12:30:45.250",
      "2024-03-01 12:30:45.250",
      "  2024-03-01T12:30:45.250Z  ",
    ];
    for case in cases {
      assert_eq!(parse_millis(case), Some(MS), "{case:?}");
    }
    assert_eq!(parse_millis("2024-03-01"), Some(1_709_251_200_000));
  }

  #[test]
  fn minute_precision_with_offset() {
    const MINUTE: i64 = 1_709_296_200_000; // 2024-03-01T12:30:00Z
    for case in ["2024-03-01T12:30Z", "2024-03-01T13:30+01:00", "2024-03-01T13:30+0100"] {
      assert_eq!(parse_millis(case), Some(MINUTE), "{case:?}");
    }
  }

  #[test]
  fn unrecognised_shapes_are_absent() {
    assert_eq!(field_millis(None), None);
    assert_eq!(to_millis(&FieldValue::Null), None);
    assert_eq!(to_millis(&FieldValue::string("")), None);
    assert_eq!(to_millis(&FieldValue::string("   ")), None);
    assert_eq!(to_millis(&FieldValue::string("next tuesday")), None);
    assert_eq!(to_millis(&FieldValue::string("2024-13-45")), None);
    assert_eq!(to_millis(&FieldValue::Integer(MS)), None);
    assert_eq!(to_millis(&FieldValue::Boolean(true)), None);
    assert_eq!(to_millis(&FieldValue::ServerTimestamp), None);
  }

  #[test]
  fn format_absent_is_empty() {
    assert_eq!(format(None), "");
    assert_eq!(format(Some(&FieldValue::Null)), "");
    assert_eq!(format(Some(&FieldValue::string("garbage"))), "");
  }

  #[test]
  fn format_present_is_not_empty() {
    let ts = FieldValue::Timestamp(Timestamp { seconds: 0, nanos: 0 });
    assert!(!format(Some(&ts)).is_empty());
    let iso = FieldValue::string("2024-03-01T12:30:45Z");
    assert!(!format(Some(&iso)).is_empty());
  }

  #[test]
  fn date_format_validation() {
    assert!(DateFormat::parse("%d/%m/%Y %H:%M").is_ok());
    assert!(matches!(
      DateFormat::parse("%Q"),
      Err(Error::InvalidDateFormat(_))
    ));
    assert!(DateFormat::parse("").is_err());
  }

  #[test]
  fn parse_only_specifiers_are_rejected() {
    for pattern in ["%#z", "%Y-%m-%d %#z"] {
      assert!(
        matches!(DateFormat::parse(pattern), Err(Error::InvalidDateFormat(_))),
        "{pattern:?}"
      );
    }
    let fmt = DateFormat::parse("%Y-%m-%d %:z").unwrap();
    let iso = FieldValue::string("2024-06-15T12:00:00Z");
    assert!(!fmt.render(Some(&iso)).is_empty());
  }

  #[test]
  fn custom_format_renders_date() {
    let fmt = DateFormat::parse("%Y").unwrap();
    let iso = FieldValue::string("2024-06-15T12:00:00Z");
    assert_eq!(fmt.render(Some(&iso)), "2024");
  }
}
