//! Error types for `evently-core`.
//!
//! Every collaborator failure is caught at the boundary of the component that
//! issued the call. User-facing messages are generic; the
//! underlying cause is kept as the error `source` for logging.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid date format: {0:?}")]
  InvalidDateFormat(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Event creation ──────────────────────────────────────────────────────────

/// Local, user-correctable input problems. Never reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("event title must not be blank")]
  BlankTitle,
  #[error("event description must not be blank")]
  BlankDescription,
}

impl ValidationError {
  pub fn user_message(&self) -> &'static str { "Please fill in all fields." }
}

/// The store rejected or failed the write.
#[derive(Debug, Error)]
#[error("event write failed: {0}")]
pub struct SubmitError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

impl SubmitError {
  pub fn user_message(&self) -> &'static str {
    "Could not create event. Please try again."
  }
}

/// Result of [`crate::submit::EventSubmitter::submit`].
#[derive(Debug, Error)]
pub enum CreateEventError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error(transparent)]
  Submit(#[from] SubmitError),
}

impl CreateEventError {
  pub fn user_message(&self) -> &'static str {
    match self {
      Self::Validation(e) => e.user_message(),
      Self::Submit(e) => e.user_message(),
    }
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// Interactive sign-in did not produce an identity.
#[derive(Debug, Error)]
pub enum AuthError {
  #[error("sign-in cancelled")]
  Cancelled,

  #[error("credentials rejected")]
  Rejected,

  #[error("identity provider error: {0}")]
  Provider(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("profile write failed: {0}")]
  Profile(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AuthError {
  /// No detail is leaked to the user, whatever the cause.
  pub fn user_message(&self) -> &'static str { "Login failed. Please try again." }
}

// ─── Live queries ────────────────────────────────────────────────────────────

/// A live query failed mid-stream (or could not be opened).
///
/// Never surfaced to the user: the event list renders empty instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("live query failed: {message}")]
pub struct SubscriptionError {
  pub message: String,
}

impl SubscriptionError {
  pub fn new(message: impl Into<String>) -> Self {
    Self { message: message.into() }
  }
}
