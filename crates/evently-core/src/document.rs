//! Document types exchanged with the event store.
//!
//! A document is an opaque id plus a map of typed fields. The store owns the
//! id; everything else is supplied by the writer, except for
//! [`FieldValue::ServerTimestamp`], which the store replaces with its own
//! commit time.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Timestamp ───────────────────────────────────────────────────────────────

/// The store's native timestamp: whole seconds since the Unix epoch plus a
/// non-negative sub-second nanosecond offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
  pub seconds: i64,
  pub nanos:   u32,
}

impl Timestamp {
  pub fn from_datetime(dt: DateTime<Utc>) -> Self {
    Self {
      seconds: dt.timestamp(),
      nanos:   dt.timestamp_subsec_nanos(),
    }
  }

  /// Milliseconds since the Unix epoch; sub-millisecond precision is
  /// truncated.
  pub fn to_millis(&self) -> i64 {
    self
      .seconds
      .saturating_mul(1_000)
      .saturating_add(i64::from(self.nanos / 1_000_000))
  }

  pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(self.seconds, self.nanos)
  }
}

// ─── FieldValue ──────────────────────────────────────────────────────────────

/// A single typed field of a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
  Null,
  Boolean(bool),
  Integer(i64),
  Double(f64),
  String(String),
  /// A store-native timestamp.
  Timestamp(Timestamp),
  /// A client-side date/time value.
  DateTime(DateTime<Utc>),
  /// Write-only sentinel: "stamp this field with the commit time".
  /// Stores never return it in snapshots.
  ServerTimestamp,
}

impl FieldValue {
  pub fn string(s: impl Into<String>) -> Self { Self::String(s.into()) }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }
}

/// Field name → value. Ordered so that serialised documents are stable.
pub type Fields = BTreeMap<String, FieldValue>;

/// Opaque, store-assigned document identifier.
pub type DocumentId = String;

// ─── Document ────────────────────────────────────────────────────────────────

/// One document as delivered in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
  pub id:     DocumentId,
  pub fields: Fields,
}

impl Document {
  pub fn get(&self, field: &str) -> Option<&FieldValue> { self.fields.get(field) }

  /// The string value of `field`, or `""` when missing or not a string.
  pub fn str_or_empty(&self, field: &str) -> &str {
    self.get(field).and_then(FieldValue::as_str).unwrap_or_default()
  }
}
