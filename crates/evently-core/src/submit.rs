//! Event creation.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
  CreateEventError, SubmitError,
  document::DocumentId,
  event::{EVENTS_COLLECTION, NewEvent},
  store::EventStore,
};

/// Validates and writes new events on behalf of the signed-in identity.
///
/// Single-shot: a failed write is reported, never retried. The live event
/// list is what confirms the write landed.
pub struct EventSubmitter<S> {
  store: Arc<S>,
}

impl<S> Clone for EventSubmitter<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: EventStore> EventSubmitter<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Validate `title` and `description` (trimmed, non-empty) and write one
  /// event owned by `owner_id`. The creation time is stamped by the store.
  pub async fn submit(
    &self,
    title: &str,
    description: &str,
    owner_id: &str,
  ) -> Result<DocumentId, CreateEventError> {
    let event = NewEvent::validate(title, description)?;
    let fields = event.into_fields(owner_id);

    let id = self
      .store
      .write(EVENTS_COLLECTION, fields)
      .await
      .map_err(|e| {
        warn!(owner = %owner_id, error = %e, "event write failed");
        SubmitError(Box::new(e))
      })?;

    info!(owner = %owner_id, event = %id, "event created");
    Ok(id)
  }
}
