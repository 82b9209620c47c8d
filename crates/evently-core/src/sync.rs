//! Live event list synchronisation.
//!
//! [`EventListSync`] binds one live query to the current identity and turns
//! the snapshots it receives into a sorted [`ViewState`].
//!
//! ```text
//!  NoIdentity ──present(id)──▶ Subscribing ──first event──▶ Streaming
//!      ▲                            │                           │
//!      └──── absent / other id / dispose (close, then reopen) ──┘
//! ```
//!
//! Every subscription is opened with a fresh [`Epoch`]. All stores push into
//! one inbox, and an event is applied only if its epoch is the one currently
//! open, so events from a subscription closed a moment ago can never overwrite
//! the view, however late they arrive.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{
  error::SubscriptionError,
  event::{self, ViewState},
  identity::IdentityState,
  store::{Epoch, EpochEvent, EventStore, LiveHandle, QueryEvent, SnapshotSink},
};

/// Where the manager is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
  NoIdentity,
  /// Subscription open, nothing received yet.
  Subscribing,
  Streaming,
}

struct Binding<H> {
  owner:     String,
  epoch:     Epoch,
  /// `None` once the subscription has failed; the binding stays so the same
  /// identity is not resubscribed in a loop.
  handle:    Option<H>,
  streaming: bool,
}

/// Owns the live query for one event list view and the state it renders.
pub struct EventListSync<S: EventStore> {
  store:      Arc<S>,
  inbox_tx:   mpsc::UnboundedSender<EpochEvent>,
  inbox_rx:   mpsc::UnboundedReceiver<EpochEvent>,
  last_epoch: Epoch,
  binding:    Option<Binding<S::Handle>>,
  view:       ViewState,
  last_error: Option<SubscriptionError>,
}

impl<S: EventStore> EventListSync<S> {
  pub fn new(store: Arc<S>) -> Self {
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    Self {
      store,
      inbox_tx,
      inbox_rx,
      last_epoch: Epoch::default(),
      binding: None,
      view: ViewState::loading(),
      last_error: None,
    }
  }

  // ── Accessors ─────────────────────────────────────────────────────────────

  pub fn view(&self) -> &ViewState { &self.view }

  pub fn phase(&self) -> SyncPhase {
    match &self.binding {
      None => SyncPhase::NoIdentity,
      Some(b) if b.streaming => SyncPhase::Streaming,
      Some(_) => SyncPhase::Subscribing,
    }
  }

  /// The epoch of the open subscription, if any.
  pub fn current_epoch(&self) -> Option<Epoch> {
    self
      .binding
      .as_ref()
      .filter(|b| b.handle.is_some())
      .map(|b| b.epoch)
  }

  /// The identity the list is currently bound to.
  pub fn owner(&self) -> Option<&str> {
    self.binding.as_ref().map(|b| b.owner.as_str())
  }

  /// The failure hidden behind the last empty list, if that is what it was.
  pub fn last_error(&self) -> Option<&SubscriptionError> { self.last_error.as_ref() }

  // ── Identity ──────────────────────────────────────────────────────────────

  /// Reconcile the subscription with a new identity state.
  ///
  /// Re-observing the identity already bound is a no-op. Any other change
  /// closes the open subscription before a new one is opened.
  pub fn set_identity(&mut self, state: &IdentityState) {
    match state.identity() {
      Some(identity) if self.owner() == Some(identity.id.as_str()) => {}
      Some(identity) => {
        self.close();
        self.open(identity.id.clone());
      }
      None => self.close(),
    }
  }

  fn open(&mut self, owner: String) {
    let epoch = self.last_epoch.next();
    self.last_epoch = epoch;
    self.view = ViewState::loading();
    self.last_error = None;

    let filter = event::owned_by(&owner);
    let sink = SnapshotSink::new(epoch, self.inbox_tx.clone());

    match self.store.live_query(filter, sink) {
      Ok(handle) => {
        info!(%epoch, %owner, "event list subscription opened");
        self.binding = Some(Binding {
          owner,
          epoch,
          handle: Some(handle),
          streaming: false,
        });
      }
      Err(e) => {
        let err = SubscriptionError::new(e.to_string());
        warn!(%epoch, %owner, error = %err, "event list subscription failed to open");
        self.binding = Some(Binding {
          owner,
          epoch,
          handle: None,
          streaming: true,
        });
        self.fail(err);
      }
    }
  }

  fn close(&mut self) {
    if let Some(mut binding) = self.binding.take() {
      if let Some(mut handle) = binding.handle.take() {
        handle.close();
      }
      info!(epoch = %binding.epoch, owner = %binding.owner, "event list subscription closed");
    }
  }

  /// Tear down for good: the view is going away.
  pub fn dispose(&mut self) { self.close(); }

  // ── Inbound events ────────────────────────────────────────────────────────

  /// Apply one event. Returns whether the view changed.
  pub fn apply(&mut self, incoming: EpochEvent) -> bool {
    let Some(binding) = self
      .binding
      .as_mut()
      .filter(|b| b.handle.is_some() && b.epoch == incoming.epoch)
    else {
      debug!(epoch = %incoming.epoch, "dropping event from stale subscription");
      return false;
    };

    binding.streaming = true;
    match incoming.event {
      QueryEvent::Snapshot(snapshot) => {
        self.view = ViewState::ready(event::records_from_snapshot(&snapshot));
        debug!(
          epoch = %incoming.epoch,
          records = self.view.records.len(),
          "event list snapshot applied"
        );
      }
      QueryEvent::Error(err) => {
        warn!(epoch = %incoming.epoch, error = %err, "event list subscription failed");
        if let Some(mut handle) = binding.handle.take() {
          handle.close();
        }
        self.fail(err);
      }
    }
    true
  }

  /// Fail-safe empty: the list renders as if there were no events.
  fn fail(&mut self, err: SubscriptionError) {
    self.view = ViewState::ready(Vec::new());
    self.last_error = Some(err);
  }

  /// Apply everything already waiting in the inbox without suspending.
  /// Returns whether the view changed.
  pub fn apply_pending(&mut self) -> bool {
    let mut changed = false;
    while let Ok(incoming) = self.inbox_rx.try_recv() {
      changed |= self.apply(incoming);
    }
    changed
  }

  /// Wait for the next inbound event, current or stale.
  pub async fn next_event(&mut self) -> EpochEvent {
    match self.inbox_rx.recv().await {
      Some(incoming) => incoming,
      // We hold a sender ourselves, so the inbox never closes.
      None => std::future::pending().await,
    }
  }

  // ── Driver ────────────────────────────────────────────────────────────────

  /// Drive the list until the identity provider or every view receiver goes
  /// away, publishing each new [`ViewState`] on `views`. The subscription is
  /// closed on exit.
  pub async fn run(
    mut self,
    mut identity: watch::Receiver<IdentityState>,
    views: watch::Sender<ViewState>,
  ) {
    let initial = identity.borrow_and_update().clone();
    self.set_identity(&initial);
    views.send_replace(self.view.clone());

    loop {
      tokio::select! {
        changed = identity.changed() => {
          if changed.is_err() {
            break;
          }
          let state = identity.borrow_and_update().clone();
          self.set_identity(&state);
        }
        incoming = self.next_event() => {
          if !self.apply(incoming) {
            continue;
          }
        }
        _ = views.closed() => break,
      }
      views.send_if_modified(|current| {
        if *current == self.view {
          false
        } else {
          *current = self.view.clone();
          true
        }
      });
    }

    self.dispose();
  }
}

impl<S: EventStore> Drop for EventListSync<S> {
  fn drop(&mut self) { self.close(); }
}
