//! Application state machine and event dispatcher.
//!
//! The app owns one mounted view at a time, chosen by the [`Router`]. A view
//! is remounted whenever the router's path changes: the event list
//! subscription of the previous view is disposed, and a protected view gets
//! a fresh [`IdentityGate`].

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use evently_core::{
  event::EventRecord,
  identity::{
    self, Credentials, GateView, IdentityGate, IdentityProvider, IdentityState, Navigator,
    ROOT_PATH,
  },
  session,
  submit::EventSubmitter,
  sync::EventListSync,
  timestamp::DateFormat,
};
use evently_store_sqlite::SqliteStore;
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
  auth::LocalIdentityProvider,
  router::{EVENTS_PATH, Route, Router},
};

/// Redirects followed in a single remount before giving up.
const MAX_REMOUNTS: usize = 4;

/// What the mounted protected view's gate last decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
  Loading,
  Protected,
  Redirected,
}

impl From<GateView<'_>> for GateStatus {
  fn from(view: GateView<'_>) -> Self {
    match view {
      GateView::Loading => Self::Loading,
      GateView::Protected(_) => Self::Protected,
      GateView::Redirected => Self::Redirected,
    }
  }
}

// ─── Forms ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateField {
  #[default]
  Title,
  Description,
}

/// The create-event form on `/`.
#[derive(Debug, Default)]
pub struct CreateForm {
  pub title:       String,
  pub description: String,
  pub focus:       CreateField,
  pub error:       Option<String>,
}

impl CreateForm {
  fn toggle_focus(&mut self) {
    self.focus = match self.focus {
      CreateField::Title => CreateField::Description,
      CreateField::Description => CreateField::Title,
    };
  }

  fn focused_mut(&mut self) -> &mut String {
    match self.focus {
      CreateField::Title => &mut self.title,
      CreateField::Description => &mut self.description,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
  #[default]
  Username,
  Password,
}

#[derive(Debug, Default)]
pub struct LoginForm {
  pub username: String,
  pub password: String,
  pub focus:    LoginField,
  pub error:    Option<String>,
}

impl LoginForm {
  fn toggle_focus(&mut self) {
    self.focus = match self.focus {
      LoginField::Username => LoginField::Password,
      LoginField::Password => LoginField::Username,
    };
  }

  fn focused_mut(&mut self) -> &mut String {
    match self.focus {
      LoginField::Username => &mut self.username,
      LoginField::Password => &mut self.password,
    }
  }
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  pub router: Router,

  /// Path of the view currently mounted; differs from the router's path only
  /// between a navigation and the following remount.
  mounted: Option<String>,

  /// Last identity state observed from the provider.
  pub identity: IdentityState,
  identity_rx:  watch::Receiver<IdentityState>,

  /// Gate of the mounted view, when it is protected, with its last answer.
  gate:        Option<IdentityGate>,
  gate_status: Option<GateStatus>,

  /// Live event list, while `/events` is mounted.
  pub events: Option<EventListSync<SqliteStore>>,

  pub create: CreateForm,
  pub login:  LoginForm,

  /// Current fuzzy-filter string (only active when `filter_active`).
  pub filter:        String,
  pub filter_active: bool,

  /// Cursor position within the *filtered* event list.
  pub list_cursor: usize,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  pub date_format: DateFormat,

  store:     Arc<SqliteStore>,
  provider:  Arc<LocalIdentityProvider>,
  submitter: EventSubmitter<SqliteStore>,
}

impl App {
  /// Create an [`App`] with `initial_path` mounted.
  pub fn new(
    store: Arc<SqliteStore>,
    provider: Arc<LocalIdentityProvider>,
    date_format: DateFormat,
    initial_path: &str,
  ) -> Self {
    let mut identity_rx = provider.subscribe();
    let identity = identity_rx.borrow_and_update().clone();

    let mut app = Self {
      router: Router::new(initial_path),
      mounted: None,
      identity,
      identity_rx,
      gate: None,
      gate_status: None,
      events: None,
      create: CreateForm::default(),
      login: LoginForm::default(),
      filter: String::new(),
      filter_active: false,
      list_cursor: 0,
      status_msg: String::new(),
      date_format,
      submitter: EventSubmitter::new(Arc::clone(&store)),
      store,
      provider,
    };
    app.remount();
    app
  }

  // ── Background updates ────────────────────────────────────────────────────

  /// Take in identity changes and live query events that arrived since the
  /// last call. Returns whether anything visible changed.
  pub fn pump(&mut self) -> bool {
    let identity_changed = self.sync_identity();
    let list_changed = self.events.as_mut().is_some_and(|e| e.apply_pending());
    if list_changed {
      self.clamp_cursor();
    }
    identity_changed || list_changed
  }

  fn sync_identity(&mut self) -> bool {
    if !self.identity_rx.has_changed().unwrap_or(false) {
      return false;
    }
    let state = self.identity_rx.borrow_and_update().clone();
    if state == self.identity {
      return false;
    }
    self.identity = state;
    self.on_identity();
    true
  }

  fn on_identity(&mut self) {
    if let Some(gate) = self.gate.as_mut() {
      self.gate_status = Some(gate.observe(&self.identity, &mut self.router).into());
    }
    if let Some(events) = self.events.as_mut() {
      events.set_identity(&self.identity);
    }
    if self.router.route() == Route::Login {
      self.resume_if_signed_in();
    }
    self.remount();
  }

  /// On the login page with an identity already present, continue to `next`.
  fn resume_if_signed_in(&mut self) {
    if self.identity.identity().is_some() {
      let target = identity::resume_target(self.router.path());
      self.router.navigate(&target);
    }
  }

  // ── Routing ───────────────────────────────────────────────────────────────

  fn go(&mut self, path: &str) {
    self.router.navigate(path);
    self.remount();
  }

  /// Mount the view the router points at, following redirects issued while
  /// mounting.
  fn remount(&mut self) {
    let mut remaining = MAX_REMOUNTS;
    while self.mounted.as_deref() != Some(self.router.path()) {
      if remaining == 0 {
        warn!(path = %self.router.path(), "navigation did not settle");
        return;
      }
      remaining -= 1;
      let path = self.router.current_path();
      self.mount(path);
    }
  }

  fn mount(&mut self, path: String) {
    if let Some(mut events) = self.events.take() {
      events.dispose();
    }
    self.gate = None;
    self.gate_status = None;
    self.filter.clear();
    self.filter_active = false;
    self.list_cursor = 0;
    self.status_msg.clear();

    let route = Route::parse(&path);
    debug!(%path, ?route, "mounting view");
    self.mounted = Some(path.clone());

    if route.is_protected() {
      let mut gate = IdentityGate::new(path);
      self.gate_status = Some(gate.observe(&self.identity, &mut self.router).into());
      self.gate = Some(gate);
    }

    match route {
      Route::Create => self.create = CreateForm::default(),
      Route::Events => {
        let mut events = EventListSync::new(Arc::clone(&self.store));
        events.set_identity(&self.identity);
        self.events = Some(events);
      }
      Route::Login => {
        self.login = LoginForm::default();
        self.resume_if_signed_in();
      }
      Route::NotFound => {}
    }
  }

  /// The gate's answer for the mounted view; `None` when it is unprotected.
  pub fn gate_status(&self) -> Option<GateStatus> { self.gate_status }

  // ── Filtered list ─────────────────────────────────────────────────────────

  /// Records that match the current filter query, newest first.
  pub fn filtered_records(&self) -> Vec<&EventRecord> {
    let Some(events) = &self.events else {
      return Vec::new();
    };
    let records = &events.view().records;
    if self.filter.is_empty() {
      return records.iter().collect();
    }
    let matcher = SkimMatcherV2::default();
    records
      .iter()
      .filter(|r| {
        matcher.fuzzy_match(&r.title, &self.filter).is_some()
          || matcher.fuzzy_match(&r.description, &self.filter).is_some()
      })
      .collect()
  }

  fn clamp_cursor(&mut self) {
    let len = self.filtered_records().len();
    self.list_cursor = self.list_cursor.min(len.saturating_sub(1));
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
      match key.code {
        KeyCode::Char('c') => return false,
        KeyCode::Char('n') => {
          self.go(ROOT_PATH);
          return true;
        }
        KeyCode::Char('e') => {
          self.go(EVENTS_PATH);
          return true;
        }
        KeyCode::Char('o') => {
          if self.identity.identity().is_some() {
            self.sign_out().await;
          }
          return true;
        }
        _ => {}
      }
    }

    if self.filter_active {
      self.handle_filter_key(key);
      return true;
    }

    if self
      .gate_status
      .is_some_and(|status| status != GateStatus::Protected)
    {
      return true;
    }
    let route = self.router.route();
    match route {
      Route::Create => self.handle_create_key(key).await,
      Route::Events => return self.handle_list_key(key),
      Route::Login => self.handle_login_key(key).await,
      Route::NotFound => match key.code {
        KeyCode::Char('q') => return false,
        _ => self.go(ROOT_PATH),
      },
    }
    true
  }

  fn handle_filter_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.filter_active = false;
        self.filter.clear();
        self.list_cursor = 0;
      }
      KeyCode::Enter => {
        self.filter_active = false;
        self.list_cursor = 0;
      }
      KeyCode::Backspace => {
        self.filter.pop();
        self.list_cursor = 0;
      }
      KeyCode::Char(c) => {
        self.filter.push(c);
        self.list_cursor = 0;
      }
      _ => {}
    }
  }

  fn handle_list_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('q') => return false,

      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.filtered_records().len();
        if len > 0 && self.list_cursor + 1 < len {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.list_cursor = self.list_cursor.saturating_sub(1);
      }

      KeyCode::Char('/') => {
        self.filter_active = true;
        self.filter.clear();
        self.list_cursor = 0;
      }

      KeyCode::Char('n') => self.go(ROOT_PATH),

      _ => {}
    }
    true
  }

  async fn handle_create_key(&mut self, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Char('s') if ctrl => self.submit_create().await,
      KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => self.create.toggle_focus(),
      KeyCode::Enter => match self.create.focus {
        CreateField::Title => self.create.focus = CreateField::Description,
        CreateField::Description => self.submit_create().await,
      },
      KeyCode::Backspace => {
        self.create.focused_mut().pop();
      }
      KeyCode::Char(c) if !ctrl => self.create.focused_mut().push(c),
      KeyCode::Esc => self.create = CreateForm::default(),
      _ => {}
    }
  }

  async fn handle_login_key(&mut self, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => self.login.toggle_focus(),
      KeyCode::Enter => match self.login.focus {
        LoginField::Username => self.login.focus = LoginField::Password,
        LoginField::Password => self.submit_login().await,
      },
      KeyCode::Backspace => {
        self.login.focused_mut().pop();
      }
      KeyCode::Char(c) if !ctrl => self.login.focused_mut().push(c),
      KeyCode::Esc => self.login = LoginForm::default(),
      _ => {}
    }
  }

  // ── Actions ───────────────────────────────────────────────────────────────

  async fn submit_create(&mut self) {
    let Some(owner) = self.identity.identity().map(|i| i.id.clone()) else {
      return;
    };
    self.create.error = None;

    let result = self
      .submitter
      .submit(&self.create.title, &self.create.description, &owner)
      .await;
    match result {
      Ok(_) => self.go(EVENTS_PATH),
      Err(e) => self.create.error = Some(e.user_message().to_owned()),
    }
  }

  async fn submit_login(&mut self) {
    self.login.error = None;
    let next = identity::resume_target(self.router.path());
    let credentials = Credentials {
      username: self.login.username.trim().to_owned(),
      password: std::mem::take(&mut self.login.password),
    };

    let result =
      session::sign_in(self.provider.as_ref(), self.store.as_ref(), credentials, &next).await;
    self.sync_identity();

    match result {
      Ok(target) => {
        if self.router.route() == Route::Login {
          self.go(&target);
        }
      }
      Err(e) => {
        let message = e.user_message().to_owned();
        if self.router.route() == Route::Login {
          self.login.error = Some(message);
        } else {
          self.status_msg = message;
        }
      }
    }
  }

  async fn sign_out(&mut self) {
    session::sign_out(self.provider.as_ref(), &mut self.router).await;
    // The view being left must not redirect on its own, so its gate is
    // skipped; the login page is already the target.
    self.identity = self.identity_rx.borrow_and_update().clone();
    if let Some(events) = self.events.as_mut() {
      events.set_identity(&self.identity);
    }
    self.remount();
  }
}
