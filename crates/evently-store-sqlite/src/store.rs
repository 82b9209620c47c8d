//! [`SqliteStore`] — the SQLite implementation of [`EventStore`].

use std::path::Path;

use chrono::Utc;
use evently_core::{
  document::{Document, DocumentId, Fields, Timestamp},
  store::{EventStore, QueryFilter, SnapshotSink},
};
use rusqlite::{OptionalExtension as _, types::Type};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawDocument, decode_fields, encode_dt, encode_fields, stamp_server_timestamps},
  live::{self, LiveQuery},
  schema::SCHEMA,
};

/// Pending change notifications per listener before it is told it lagged.
const CHANGE_BUFFER: usize = 64;

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Evently document store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection and change channel are
/// reference-counted, and clones share live-query notifications.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  /// Name of the collection touched by each committed write.
  changes: broadcast::Sender<String>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_connection(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_connection(conn).await
  }

  async fn with_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (changes, _) = broadcast::channel(CHANGE_BUFFER);
    let store = Self { conn, changes };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub(crate) fn subscribe_changes(&self) -> broadcast::Receiver<String> {
    self.changes.subscribe()
  }

  fn notify(&self, collection: &str) {
    // No receivers simply means nobody is listening.
    let _ = self.changes.send(collection.to_owned());
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// All documents matching `filter`, in insertion order.
  pub async fn query(&self, filter: &QueryFilter) -> Result<Vec<Document>> {
    let collection = filter.collection.clone();

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT collection, doc_id, fields FROM documents
           WHERE collection = ?1 ORDER BY seq",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![collection], |row| {
            Ok(RawDocument {
              collection: row.get(0)?,
              doc_id:     row.get(1)?,
              fields:     row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut documents = Vec::with_capacity(raws.len());
    for raw in raws {
      let doc = raw.into_document()?;
      if filter.matches(&doc.fields) {
        documents.push(doc);
      }
    }
    Ok(documents)
  }

  /// Retrieve one document. Returns `None` if not found.
  pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
    let collection = collection.to_owned();
    let id = id.to_owned();

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT collection, doc_id, fields FROM documents
             WHERE collection = ?1 AND doc_id = ?2",
            rusqlite::params![collection, id],
            |row| {
              Ok(RawDocument {
                collection: row.get(0)?,
                doc_id:     row.get(1)?,
                fields:     row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  type Error = crate::Error;
  type Handle = LiveQuery;

  fn live_query(&self, filter: QueryFilter, sink: SnapshotSink) -> Result<LiveQuery> {
    live::spawn(self.clone(), filter, sink)
  }

  async fn write(&self, collection: &str, fields: Fields) -> Result<DocumentId> {
    let now = Utc::now();
    let fields = stamp_server_timestamps(fields, Timestamp::from_datetime(now));
    let id = Uuid::new_v4().hyphenated().to_string();

    let collection_str = collection.to_owned();
    let id_str         = id.clone();
    let fields_str     = encode_fields(&fields)?;
    let at_str         = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (collection, doc_id, fields, updated_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![collection_str, id_str, fields_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    debug!(%collection, %id, "document written");
    self.notify(collection);
    Ok(id)
  }

  async fn write_merge(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
    let now = Utc::now();
    let patch = stamp_server_timestamps(fields, Timestamp::from_datetime(now));

    let collection_str = collection.to_owned();
    let id_str         = id.to_owned();
    let patch_str      = encode_fields(&patch)?;
    let at_str         = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
          .query_row(
            "SELECT fields FROM documents WHERE collection = ?1 AND doc_id = ?2",
            rusqlite::params![collection_str, id_str],
            |row| row.get(0),
          )
          .optional()?;

        match existing {
          Some(existing) => {
            let mut merged = decode_fields(&existing).map_err(|e| {
              rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
            })?;
            merged.extend(patch);
            let merged_str = serde_json::to_string(&merged)
              .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            tx.execute(
              "UPDATE documents SET fields = ?3, updated_at = ?4
               WHERE collection = ?1 AND doc_id = ?2",
              rusqlite::params![collection_str, id_str, merged_str, at_str],
            )?;
          }
          None => {
            tx.execute(
              "INSERT INTO documents (collection, doc_id, fields, updated_at)
               VALUES (?1, ?2, ?3, ?4)",
              rusqlite::params![collection_str, id_str, patch_str, at_str],
            )?;
          }
        }

        tx.commit()?;
        Ok(())
      })
      .await?;

    debug!(%collection, %id, "document merged");
    self.notify(collection);
    Ok(())
  }
}
