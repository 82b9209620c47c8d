//! Integration tests for `SqliteStore` against an in-memory database.

use std::{sync::Arc, time::Duration};

use evently_core::{
  document::{FieldValue, Fields},
  event::{self, CREATED_AT_FIELD, EVENTS_COLLECTION, OWNER_FIELD, Phase, TITLE_FIELD},
  identity::{Identity, IdentityState},
  session::{USERS_COLLECTION, profile_fields},
  store::{Epoch, EpochEvent, EventStore, LiveHandle, QueryEvent, SnapshotSink},
  submit::EventSubmitter,
  sync::EventListSync,
};
use tokio::{sync::mpsc::UnboundedReceiver, time::timeout};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn event_fields(title: &str, owner: &str) -> Fields {
  event::NewEvent::validate(title, "about")
    .unwrap()
    .into_fields(owner)
}

async fn next(rx: &mut UnboundedReceiver<EpochEvent>) -> EpochEvent {
  timeout(Duration::from_secs(5), rx.recv())
    .await
    .expect("live query event")
    .expect("sink open")
}

async fn assert_quiet(rx: &mut UnboundedReceiver<EpochEvent>) {
  assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
}

fn titles(event: &EpochEvent) -> Vec<String> {
  match &event.event {
    QueryEvent::Snapshot(snapshot) => snapshot
      .documents
      .iter()
      .map(|d| d.str_or_empty(TITLE_FIELD).to_owned())
      .collect(),
    QueryEvent::Error(e) => panic!("unexpected error event: {e}"),
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn write_assigns_id_and_stamps_created_at() {
  let s = store().await;

  let id = s.write(EVENTS_COLLECTION, event_fields("Meetup", "u1")).await.unwrap();
  let doc = s.get(EVENTS_COLLECTION, &id).await.unwrap().expect("document");

  assert_eq!(doc.id, id);
  assert_eq!(doc.get(TITLE_FIELD), Some(&FieldValue::string("Meetup")));
  match doc.get(CREATED_AT_FIELD) {
    Some(FieldValue::Timestamp(ts)) => assert!(ts.seconds > 0),
    other => panic!("createdAt not stamped: {other:?}"),
  }
}

#[tokio::test]
async fn write_ids_are_unique() {
  let s = store().await;
  let a = s.write(EVENTS_COLLECTION, event_fields("A", "u1")).await.unwrap();
  let b = s.write(EVENTS_COLLECTION, event_fields("B", "u1")).await.unwrap();
  assert_ne!(a, b);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(EVENTS_COLLECTION, "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn write_merge_creates_then_merges() {
  let s = store().await;
  let mut identity = Identity::new("u1");
  identity.display_name = Some("Ada".into());

  s.write_merge(USERS_COLLECTION, "u1", profile_fields(&identity))
    .await
    .unwrap();

  let patch = Fields::from([("name".to_owned(), FieldValue::string("Ada L."))]);
  s.write_merge(USERS_COLLECTION, "u1", patch).await.unwrap();

  let doc = s.get(USERS_COLLECTION, "u1").await.unwrap().expect("profile");
  assert_eq!(doc.get("name"), Some(&FieldValue::string("Ada L.")));
  assert_eq!(doc.get("uid"), Some(&FieldValue::string("u1")));
  assert!(matches!(doc.get("createdAt"), Some(FieldValue::Timestamp(_))));
}

#[tokio::test]
async fn query_filters_by_owner_in_insertion_order() {
  let s = store().await;
  s.write(EVENTS_COLLECTION, event_fields("first", "u1")).await.unwrap();
  s.write(EVENTS_COLLECTION, event_fields("theirs", "u2")).await.unwrap();
  s.write(EVENTS_COLLECTION, event_fields("second", "u1")).await.unwrap();

  let docs = s.query(&event::owned_by("u1")).await.unwrap();
  let titles: Vec<_> = docs.iter().map(|d| d.str_or_empty(TITLE_FIELD)).collect();
  assert_eq!(titles, ["first", "second"]);
  assert!(docs
    .iter()
    .all(|d| d.get(OWNER_FIELD) == Some(&FieldValue::string("u1"))));
}

// ─── Live queries ────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_query_pushes_initial_and_updated_snapshots() {
  let s = store().await;
  s.write(EVENTS_COLLECTION, event_fields("existing", "u1")).await.unwrap();

  let (sink, mut rx) = SnapshotSink::channel(Epoch::new(7));
  let _handle = s.live_query(event::owned_by("u1"), sink).unwrap();

  let initial = next(&mut rx).await;
  assert_eq!(initial.epoch, Epoch::new(7));
  assert_eq!(titles(&initial), ["existing"]);

  s.write(EVENTS_COLLECTION, event_fields("new", "u1")).await.unwrap();
  assert_eq!(titles(&next(&mut rx).await), ["existing", "new"]);

  // Another owner's write re-runs the query; the result is unchanged.
  s.write(EVENTS_COLLECTION, event_fields("theirs", "u2")).await.unwrap();
  assert_eq!(titles(&next(&mut rx).await), ["existing", "new"]);
}

#[tokio::test]
async fn live_query_ignores_other_collections() {
  let s = store().await;
  let (sink, mut rx) = SnapshotSink::channel(Epoch::new(1));
  let _handle = s.live_query(event::owned_by("u1"), sink).unwrap();
  next(&mut rx).await;

  s.write_merge(USERS_COLLECTION, "u1", profile_fields(&Identity::new("u1")))
    .await
    .unwrap();
  assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn closed_live_query_stops_delivering() {
  let s = store().await;
  let (sink, mut rx) = SnapshotSink::channel(Epoch::new(1));
  let mut handle = s.live_query(event::owned_by("u1"), sink).unwrap();
  next(&mut rx).await;

  handle.close();
  handle.close();
  assert!(handle.is_closed());
  tokio::time::sleep(Duration::from_millis(20)).await;

  s.write(EVENTS_COLLECTION, event_fields("late", "u1")).await.unwrap();
  assert_quiet(&mut rx).await;
}

#[test]
fn live_query_outside_runtime_is_an_error() {
  let runtime = tokio::runtime::Runtime::new().unwrap();
  let s = runtime.block_on(store());

  let (sink, _rx) = SnapshotSink::channel(Epoch::new(1));
  assert!(matches!(
    s.live_query(event::owned_by("u1"), sink),
    Err(Error::NoRuntime)
  ));
}

// ─── With the event list ─────────────────────────────────────────────────────

#[tokio::test]
async fn event_list_follows_submitted_events() {
  let s = Arc::new(store().await);
  s.write(EVENTS_COLLECTION, event_fields("someone else's", "u2")).await.unwrap();

  let mut list = EventListSync::new(Arc::clone(&s));
  let submitter = EventSubmitter::new(Arc::clone(&s));

  list.set_identity(&IdentityState::Present(Identity::new("u1")));
  let first = list.next_event().await;
  assert!(list.apply(first));
  assert_eq!(list.view().phase, Phase::Ready);
  assert!(list.view().is_empty());

  submitter.submit("Older", "one", "u1").await.unwrap();
  let update = list.next_event().await;
  list.apply(update);

  tokio::time::sleep(Duration::from_millis(5)).await;
  submitter.submit("Newer", "two", "u1").await.unwrap();
  let update = list.next_event().await;
  list.apply(update);

  let view = list.view();
  let titles: Vec<_> = view.records.iter().map(|r| r.title.as_str()).collect();
  assert_eq!(titles, ["Newer", "Older"]);
  assert!(view.records.iter().all(|r| r.owner_id == "u1"));
  assert!(view.records.iter().all(|r| r.created_at_millis().is_some()));

  list.set_identity(&IdentityState::Absent);
  assert!(list.current_epoch().is_none());
}
