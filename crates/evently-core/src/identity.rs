//! The signed-in identity and the gate that protects views.
//!
//! The current identity is published by an [`IdentityProvider`] through a
//! `tokio::sync::watch` channel. Components that depend on it take a receiver
//! explicitly; nothing reads it from ambient state.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::AuthError;

/// Unauthenticated entry point.
pub const LOGIN_PATH: &str = "/login";
/// Where sign-in resumes when no `next` was carried.
pub const ROOT_PATH: &str = "/";
/// Query parameter carrying the path to resume after sign-in.
pub const NEXT_PARAM: &str = "next";

// ─── Identity ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:           String,
  pub display_name: Option<String>,
  pub email:        Option<String>,
  pub photo_url:    Option<String>,
}

impl Identity {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id:           id.into(),
      display_name: None,
      email:        None,
      photo_url:    None,
    }
  }

  /// Display name, falling back to email, then id.
  pub fn label(&self) -> &str {
    self
      .display_name
      .as_deref()
      .filter(|s| !s.is_empty())
      .or(self.email.as_deref().filter(|s| !s.is_empty()))
      .unwrap_or(&self.id)
  }
}

/// The identity signal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdentityState {
  /// The provider has not resolved yet.
  #[default]
  Unknown,
  Absent,
  Present(Identity),
}

impl IdentityState {
  pub fn identity(&self) -> Option<&Identity> {
    match self {
      Self::Present(identity) => Some(identity),
      _ => None,
    }
  }
}

/// What the user typed into the sign-in form.
#[derive(Clone, Default)]
pub struct Credentials {
  pub username: String,
  pub password: String,
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials")
      .field("username", &self.username)
      .finish_non_exhaustive()
  }
}

// ─── Collaborator traits ─────────────────────────────────────────────────────

/// The authentication collaborator.
pub trait IdentityProvider: Send + Sync {
  /// Receive the current identity and every later change. Dropping the
  /// receiver unsubscribes.
  fn subscribe(&self) -> watch::Receiver<IdentityState>;

  /// Authenticate interactively. On success the new identity is also
  /// published to subscribers.
  fn sign_in_interactive(
    &self,
    credentials: Credentials,
  ) -> impl Future<Output = Result<Identity, AuthError>> + Send + '_;

  /// Publish [`IdentityState::Absent`].
  fn sign_out(&self) -> impl Future<Output = ()> + Send + '_;
}

/// Page routing collaborator.
pub trait Navigator {
  fn navigate(&mut self, path: &str);

  fn current_path(&self) -> String;
}

// ─── Redirect-with-resume ────────────────────────────────────────────────────

/// `/login?next=<requested, url-encoded>`.
pub fn login_redirect(requested: &str) -> String {
  format!("{LOGIN_PATH}?{NEXT_PARAM}={}", urlencoding::encode(requested))
}

/// The decoded `next` parameter of `path`, or `/` when absent, empty or
/// undecodable.
pub fn resume_target(path: &str) -> String {
  path
    .split_once('?')
    .map(|(_, query)| query)
    .into_iter()
    .flat_map(|query| query.split('&'))
    .filter_map(|pair| pair.split_once('='))
    .find(|(key, _)| *key == NEXT_PARAM)
    .and_then(|(_, value)| urlencoding::decode(value).ok())
    .map(|value| value.into_owned())
    .filter(|value| !value.is_empty())
    .unwrap_or_else(|| ROOT_PATH.to_owned())
}

/// The path without its query string.
pub fn route_of(path: &str) -> &str {
  path.split_once('?').map_or(path, |(route, _)| route)
}

// ─── Gate ────────────────────────────────────────────────────────────────────

/// What a protected view should render for the current identity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateView<'a> {
  /// Identity unresolved: neutral placeholder, nothing else.
  Loading,
  /// Render the protected content for this identity.
  Protected(&'a Identity),
  /// Signed out: render nothing; a redirect to the login page has been
  /// issued.
  Redirected,
}

/// Guards one protected view mounted at `requested_path`.
///
/// The redirect fires once on each transition into
/// [`IdentityState::Absent`] (including initial resolution to it), never on
/// repeated observations while absent.
#[derive(Debug, Clone)]
pub struct IdentityGate {
  requested_path: String,
  was_absent:     bool,
}

impl IdentityGate {
  pub fn new(requested_path: impl Into<String>) -> Self {
    Self {
      requested_path: requested_path.into(),
      was_absent:     false,
    }
  }

  pub fn observe<'s, N: Navigator + ?Sized>(
    &mut self,
    state: &'s IdentityState,
    navigator: &mut N,
  ) -> GateView<'s> {
    match state {
      IdentityState::Unknown => {
        self.was_absent = false;
        GateView::Loading
      }
      IdentityState::Present(identity) => {
        self.was_absent = false;
        GateView::Protected(identity)
      }
      IdentityState::Absent => {
        if !self.was_absent {
          self.was_absent = true;
          let target = login_redirect(&self.requested_path);
          info!(from = %self.requested_path, to = %target, "redirecting to login");
          navigator.navigate(&target);
        }
        GateView::Redirected
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct RecordingNavigator {
    current: String,
    visits:  Vec<String>,
  }

  impl Navigator for RecordingNavigator {
    fn navigate(&mut self, path: &str) {
      self.current = path.to_owned();
      self.visits.push(path.to_owned());
    }

    fn current_path(&self) -> String { self.current.clone() }
  }

  #[test]
  fn unknown_to_absent_redirects_once_with_next() {
    let mut nav = RecordingNavigator::default();
    let mut gate = IdentityGate::new("/events");

    assert_eq!(gate.observe(&IdentityState::Unknown, &mut nav), GateView::Loading);
    assert!(nav.visits.is_empty());

    assert_eq!(gate.observe(&IdentityState::Absent, &mut nav), GateView::Redirected);
    assert_eq!(gate.observe(&IdentityState::Absent, &mut nav), GateView::Redirected);
    assert_eq!(nav.visits, ["/login?next=%2Fevents"]);
  }

  #[test]
  fn unknown_to_present_never_navigates() {
    let mut nav = RecordingNavigator::default();
    let mut gate = IdentityGate::new("/");
    let present = IdentityState::Present(Identity::new("u1"));

    gate.observe(&IdentityState::Unknown, &mut nav);
    match gate.observe(&present, &mut nav) {
      GateView::Protected(identity) => assert_eq!(identity.id, "u1"),
      other => panic!("unexpected {other:?}"),
    }
    assert!(nav.visits.is_empty());
  }

  #[test]
  fn sign_out_after_present_redirects_again() {
    let mut nav = RecordingNavigator::default();
    let mut gate = IdentityGate::new("/");
    let present = IdentityState::Present(Identity::new("u1"));

    gate.observe(&IdentityState::Absent, &mut nav);
    gate.observe(&present, &mut nav);
    gate.observe(&IdentityState::Absent, &mut nav);
    assert_eq!(nav.visits.len(), 2);
  }

  #[test]
  fn resume_target_decodes_next() {
    assert_eq!(resume_target(&login_redirect("/events?x=1&y=2")), "/events?x=1&y=2");
    assert_eq!(resume_target("/login?next=%2Fevents"), "/events");
    assert_eq!(resume_target("/login?foo=bar&next=%2F"), "/");
    assert_eq!(resume_target("/login"), "/");
    assert_eq!(resume_target("/login?next="), "/");
    assert_eq!(resume_target("/login?next=%FF"), "/");
  }

  #[test]
  fn route_of_strips_query() {
    assert_eq!(route_of("/login?next=%2F"), "/login");
    assert_eq!(route_of("/events"), "/events");
  }

  #[test]
  fn label_falls_back() {
    let mut identity = Identity::new("u1");
    assert_eq!(identity.label(), "u1");
    identity.email = Some("a@example.com".into());
    assert_eq!(identity.label(), "a@example.com");
    identity.display_name = Some("Ada".into());
    assert_eq!(identity.label(), "Ada");
  }
}
