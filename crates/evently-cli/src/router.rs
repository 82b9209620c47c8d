//! In-process page routing.

use evently_core::identity::{LOGIN_PATH, Navigator, ROOT_PATH, route_of};
use tracing::debug;

pub const EVENTS_PATH: &str = "/events";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  /// `/`, the create-event form.
  Create,
  Events,
  Login,
  NotFound,
}

impl Route {
  pub fn parse(path: &str) -> Self {
    match route_of(path) {
      ROOT_PATH => Self::Create,
      EVENTS_PATH => Self::Events,
      LOGIN_PATH => Self::Login,
      _ => Self::NotFound,
    }
  }

  /// Routes that render only for a signed-in identity.
  pub fn is_protected(self) -> bool { matches!(self, Self::Create | Self::Events) }
}

/// The current path. Navigation replaces it; there is no back stack.
#[derive(Debug)]
pub struct Router {
  current: String,
}

impl Router {
  pub fn new(initial: impl Into<String>) -> Self {
    Self { current: initial.into() }
  }

  pub fn route(&self) -> Route { Route::parse(&self.current) }

  pub fn path(&self) -> &str { &self.current }
}

impl Navigator for Router {
  fn navigate(&mut self, path: &str) {
    debug!(from = %self.current, to = %path, "navigate");
    self.current = path.to_owned();
  }

  fn current_path(&self) -> String { self.current.clone() }
}
