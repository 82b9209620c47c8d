//! Error type for `evently-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("document {collection}/{id} has malformed fields: {reason}")]
  MalformedDocument {
    collection: String,
    id:         String,
    reason:     String,
  },

  /// Live queries spawn a listener task and need a tokio runtime to do so.
  #[error("live queries require a running tokio runtime")]
  NoRuntime,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
