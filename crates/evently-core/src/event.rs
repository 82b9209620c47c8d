//! Event records, the view model rendered by the event list, and the stored
//! document layout they are read from.

use std::cmp::Reverse;

use crate::{
  ValidationError,
  document::{Document, DocumentId, FieldValue, Fields},
  store::{QueryFilter, Snapshot},
  timestamp,
};

// ─── Stored layout ───────────────────────────────────────────────────────────

pub const EVENTS_COLLECTION: &str = "events";
pub const TITLE_FIELD: &str = "title";
pub const DESCRIPTION_FIELD: &str = "description";
pub const OWNER_FIELD: &str = "userId";
pub const CREATED_AT_FIELD: &str = "createdAt";

/// The live query for every event owned by `owner_id`.
pub fn owned_by(owner_id: &str) -> QueryFilter {
  QueryFilter::eq(EVENTS_COLLECTION, OWNER_FIELD, FieldValue::string(owner_id))
}

// ─── EventRecord ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
  pub id:          DocumentId,
  pub title:       String,
  pub description: String,
  pub owner_id:    String,
  /// Missing until the store has stamped a pending write.
  pub created_at:  Option<FieldValue>,
}

impl EventRecord {
  pub fn from_document(doc: &Document) -> Self {
    Self {
      id:          doc.id.clone(),
      title:       doc.str_or_empty(TITLE_FIELD).to_owned(),
      description: doc.str_or_empty(DESCRIPTION_FIELD).to_owned(),
      owner_id:    doc.str_or_empty(OWNER_FIELD).to_owned(),
      created_at:  doc.get(CREATED_AT_FIELD).filter(|v| !v.is_null()).cloned(),
    }
  }

  pub fn created_at_millis(&self) -> Option<i64> {
    timestamp::field_millis(self.created_at.as_ref())
  }
}

/// Newest first. Records without a recognisable timestamp sort as if created
/// at the epoch. The sort is stable, so ties keep their snapshot order.
pub fn sort_newest_first(records: &mut [EventRecord]) {
  records.sort_by_key(|r| Reverse(r.created_at_millis().unwrap_or(0)));
}

/// Map and order a snapshot for display.
pub fn records_from_snapshot(snapshot: &Snapshot) -> Vec<EventRecord> {
  let mut records: Vec<_> = snapshot
    .documents
    .iter()
    .map(EventRecord::from_document)
    .collect();
  sort_newest_first(&mut records);
  records
}

// ─── ViewState ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
  /// No snapshot of the current subscription has arrived yet.
  #[default]
  Loading,
  Ready,
}

/// What the event list renders. Replaced wholesale on every snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
  pub phase:   Phase,
  pub records: Vec<EventRecord>,
}

impl ViewState {
  pub fn loading() -> Self { Self::default() }

  pub fn ready(records: Vec<EventRecord>) -> Self {
    Self { phase: Phase::Ready, records }
  }

  pub fn is_loading(&self) -> bool { self.phase == Phase::Loading }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

// ─── NewEvent ────────────────────────────────────────────────────────────────

/// A validated, trimmed event ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
  pub title:       String,
  pub description: String,
}

impl NewEvent {
  pub fn validate(title: &str, description: &str) -> Result<Self, ValidationError> {
    let title = title.trim();
    let description = description.trim();
    if title.is_empty() {
      return Err(ValidationError::BlankTitle);
    }
    if description.is_empty() {
      return Err(ValidationError::BlankDescription);
    }
    Ok(Self {
      title:       title.to_owned(),
      description: description.to_owned(),
    })
  }

  /// The stored document. `createdAt` is left for the store to stamp.
  pub fn into_fields(self, owner_id: &str) -> Fields {
    Fields::from([
      (TITLE_FIELD.to_owned(), FieldValue::String(self.title)),
      (DESCRIPTION_FIELD.to_owned(), FieldValue::String(self.description)),
      (OWNER_FIELD.to_owned(), FieldValue::string(owner_id)),
      (CREATED_AT_FIELD.to_owned(), FieldValue::ServerTimestamp),
    ])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::document::Timestamp;

  fn record(id: &str, created_at: Option<i64>) -> EventRecord {
    EventRecord {
      id:          id.into(),
      title:       String::new(),
      description: String::new(),
      owner_id:    "u1".into(),
      created_at:  created_at.map(|ms| {
        FieldValue::Timestamp(Timestamp {
          seconds: ms,
          nanos:   0,
        })
      }),
    }
  }

  fn ids(records: &[EventRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
  }

  #[test]
  fn sorts_newest_first_with_absent_last_and_stable_ties() {
    let mut records = vec![
      record("five-a", Some(5)),
      record("absent", None),
      record("ten", Some(10)),
      record("five-b", Some(5)),
    ];
    sort_newest_first(&mut records);
    assert_eq!(ids(&records), ["ten", "five-a", "five-b", "absent"]);
  }

  #[test]
  fn absent_timestamps_keep_snapshot_order() {
    let mut records = vec![record("a", None), record("b", None), record("c", None)];
    sort_newest_first(&mut records);
    assert_eq!(ids(&records), ["a", "b", "c"]);
  }

  #[test]
  fn from_document_defaults_missing_fields() {
    let doc = Document {
      id:     "e1".into(),
      fields: Fields::from([
        (OWNER_FIELD.to_owned(), FieldValue::string("u1")),
        (CREATED_AT_FIELD.to_owned(), FieldValue::Null),
      ]),
    };
    let rec = EventRecord::from_document(&doc);
    assert_eq!(rec.title, "");
    assert_eq!(rec.description, "");
    assert_eq!(rec.owner_id, "u1");
    assert_eq!(rec.created_at, None);
  }

  #[test]
  fn validate_trims_and_rejects_blanks() {
    let ev = NewEvent::validate("  Meetup ", "\tTalks\n").unwrap();
    assert_eq!(ev.title, "Meetup");
    assert_eq!(ev.description, "Talks");

    assert_eq!(NewEvent::validate("   ", "x"), Err(ValidationError::BlankTitle));
    assert_eq!(
      NewEvent::validate("x", ""),
      Err(ValidationError::BlankDescription)
    );
  }

  #[test]
  fn into_fields_leaves_created_at_to_the_store() {
    let fields = NewEvent::validate("T", "D").unwrap().into_fields("u1");
    assert_eq!(fields.get(CREATED_AT_FIELD), Some(&FieldValue::ServerTimestamp));
    assert_eq!(fields.get(OWNER_FIELD), Some(&FieldValue::string("u1")));
    assert!(owned_by("u1").matches(&fields));
    assert!(!owned_by("u2").matches(&fields));
  }
}
