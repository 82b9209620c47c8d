//! Live queries over [`SqliteStore`].
//!
//! Each live query is a listener task. It pushes an initial snapshot, then
//! waits for a write to its collection and pushes the full result again.
//! Writes are not diffed: every snapshot is the complete result set.

use evently_core::{
  SubscriptionError,
  store::{LiveHandle, QueryEvent, QueryFilter, Snapshot, SnapshotSink},
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Error, Result, SqliteStore};

/// Handle to a running live query. Closing (or dropping) it stops the
/// listener.
#[derive(Debug)]
pub struct LiveQuery {
  cancel: CancellationToken,
}

impl LiveQuery {
  pub fn is_closed(&self) -> bool { self.cancel.is_cancelled() }
}

impl LiveHandle for LiveQuery {
  fn close(&mut self) { self.cancel.cancel(); }
}

impl Drop for LiveQuery {
  fn drop(&mut self) { self.cancel.cancel(); }
}

pub(crate) fn spawn(
  store: SqliteStore,
  filter: QueryFilter,
  sink: SnapshotSink,
) -> Result<LiveQuery> {
  let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
  let cancel = CancellationToken::new();
  // Subscribe before the first read so no write can slip in between.
  let changes = store.subscribe_changes();
  runtime.spawn(listen(store, filter, sink, changes, cancel.clone()));
  Ok(LiveQuery { cancel })
}

async fn listen(
  store: SqliteStore,
  filter: QueryFilter,
  sink: SnapshotSink,
  mut changes: broadcast::Receiver<String>,
  cancel: CancellationToken,
) {
  let epoch = sink.epoch();
  debug!(%epoch, %filter, "live query started");

  loop {
    let event = tokio::select! {
      _ = cancel.cancelled() => break,
      result = store.query(&filter) => match result {
        Ok(documents) => QueryEvent::Snapshot(Snapshot { documents }),
        Err(e) => QueryEvent::Error(SubscriptionError::new(e.to_string())),
      },
    };

    let terminal = matches!(event, QueryEvent::Error(_));
    if cancel.is_cancelled() || !sink.send(event) || terminal {
      break;
    }
    if !wait_for_change(&mut changes, &filter.collection, &cancel).await {
      break;
    }
  }

  debug!(%epoch, "live query stopped");
}

/// Resolve `true` once `collection` may have changed, `false` on
/// cancellation.
async fn wait_for_change(
  changes: &mut broadcast::Receiver<String>,
  collection: &str,
  cancel: &CancellationToken,
) -> bool {
  loop {
    tokio::select! {
      _ = cancel.cancelled() => return false,
      change = changes.recv() => match change {
        Ok(changed) if changed == collection => return true,
        Ok(_) => {}
        // Notifications were dropped; a fresh snapshot covers them all.
        Err(RecvError::Lagged(_)) => return true,
        Err(RecvError::Closed) => return false,
      },
    }
  }
}
