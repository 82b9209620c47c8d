//! Encoding and decoding helpers between document fields and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Document fields are stored as a
//! compact JSON object of tagged [`FieldValue`]s.

use chrono::{DateTime, Utc};
use evently_core::document::{Document, FieldValue, Fields, Timestamp};

use crate::{Error, Result};

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Fields ───────────────────────────────────────────────────────────────────

pub fn encode_fields(fields: &Fields) -> Result<String> {
  Ok(serde_json::to_string(fields)?)
}

pub fn decode_fields(s: &str) -> serde_json::Result<Fields> { serde_json::from_str(s) }

/// Replace every [`FieldValue::ServerTimestamp`] sentinel with the commit
/// time.
pub fn stamp_server_timestamps(mut fields: Fields, now: Timestamp) -> Fields {
  for value in fields.values_mut() {
    if matches!(value, FieldValue::ServerTimestamp) {
      *value = FieldValue::Timestamp(now);
    }
  }
  fields
}

// ─── Raw row ──────────────────────────────────────────────────────────────────

/// A `documents` row as read from SQLite, before JSON decoding.
pub struct RawDocument {
  pub collection: String,
  pub doc_id:     String,
  pub fields:     String,
}

impl RawDocument {
  pub fn into_document(self) -> Result<Document> {
    let fields = decode_fields(&self.fields).map_err(|e| Error::MalformedDocument {
      collection: self.collection,
      id:         self.doc_id.clone(),
      reason:     e.to_string(),
    })?;
    Ok(Document {
      id: self.doc_id,
      fields,
    })
  }
}
