//! The `EventStore` trait and live-query plumbing.
//!
//! The trait is implemented by storage backends (e.g. `evently-store-sqlite`).
//! Higher layers depend on this abstraction, not on any concrete backend.
//!
//! Live queries are push-based: the store delivers a complete snapshot of the
//! matching documents every time the result may have changed. Each
//! subscription is tagged with an [`Epoch`] chosen by the subscriber, and
//! every event the store pushes through the [`SnapshotSink`] carries it, so
//! the subscriber can discard events from subscriptions it already closed.

use std::{fmt, future::Future};

use tokio::sync::mpsc;

use crate::{
  document::{Document, DocumentId, FieldValue, Fields},
  error::SubscriptionError,
};

// ─── Query ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
  Eq,
}

impl fmt::Display for FilterOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Eq => f.write_str("=="),
    }
  }
}

/// A single-field filter over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
  pub collection: String,
  pub field:      String,
  pub op:         FilterOp,
  pub value:      FieldValue,
}

impl QueryFilter {
  pub fn eq(
    collection: impl Into<String>,
    field: impl Into<String>,
    value: FieldValue,
  ) -> Self {
    Self {
      collection: collection.into(),
      field: field.into(),
      op: FilterOp::Eq,
      value,
    }
  }

  pub fn matches(&self, fields: &Fields) -> bool {
    match self.op {
      FilterOp::Eq => fields.get(&self.field) == Some(&self.value),
    }
  }
}

impl fmt::Display for QueryFilter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}[{} {} {:?}]", self.collection, self.field, self.op, self.value)
  }
}

// ─── Live query events ───────────────────────────────────────────────────────

/// The complete result set of a live query at one point in time, in the
/// store's order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
  pub documents: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryEvent {
  Snapshot(Snapshot),
  /// Terminal: the store delivers nothing further for this subscription.
  Error(SubscriptionError),
}

/// Monotonically increasing subscription tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
  pub const fn new(n: u64) -> Self { Self(n) }

  pub fn next(self) -> Self { Self(self.0 + 1) }
}

impl fmt::Display for Epoch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// A [`QueryEvent`] together with the epoch of the subscription it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochEvent {
  pub epoch: Epoch,
  pub event: QueryEvent,
}

/// Where a store pushes the events of one live query.
///
/// Cloning is cheap; every clone tags with the same epoch.
#[derive(Debug, Clone)]
pub struct SnapshotSink {
  epoch: Epoch,
  tx:    mpsc::UnboundedSender<EpochEvent>,
}

impl SnapshotSink {
  pub fn new(epoch: Epoch, tx: mpsc::UnboundedSender<EpochEvent>) -> Self {
    Self { epoch, tx }
  }

  /// A sink and the receiving end of a fresh channel.
  pub fn channel(epoch: Epoch) -> (Self, mpsc::UnboundedReceiver<EpochEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self::new(epoch, tx), rx)
  }

  pub fn epoch(&self) -> Epoch { self.epoch }

  /// Push an event. Returns `false` once the subscriber has gone away, at
  /// which point the store should stop the query.
  pub fn send(&self, event: QueryEvent) -> bool {
    self.tx.send(EpochEvent { epoch: self.epoch, event }).is_ok()
  }
}

/// Handle to a running live query.
pub trait LiveHandle: Send {
  /// Stop the query. Idempotent. Events already in flight may still be
  /// delivered afterwards; subscribers guard against them by epoch.
  fn close(&mut self);
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a document store with live queries.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait EventStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
  type Handle: LiveHandle;

  /// Start a live query. The first snapshot is delivered asynchronously
  /// through `sink`, followed by a fresh snapshot whenever the result may
  /// have changed.
  fn live_query(
    &self,
    filter: QueryFilter,
    sink: SnapshotSink,
  ) -> Result<Self::Handle, Self::Error>;

  /// Create a document with a store-assigned id.
  /// [`FieldValue::ServerTimestamp`] values are replaced by the commit time.
  fn write<'a>(
    &'a self,
    collection: &'a str,
    fields: Fields,
  ) -> impl Future<Output = Result<DocumentId, Self::Error>> + Send + 'a;

  /// Create the document `id`, or overwrite only the given fields if it
  /// already exists.
  fn write_merge<'a>(
    &'a self,
    collection: &'a str,
    id: &'a str,
    fields: Fields,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
