//! Core types and trait definitions for Evently.
//!
//! This crate has no database or terminal dependencies.
//! It holds the domain model, the collaborator traits (event store, identity
//! provider, navigator) and the client-side reconciliation logic layered on
//! top of them: timestamp normalisation, the identity gate, the live event
//! list subscription manager and the event submitter.

pub mod document;
pub mod error;
pub mod event;
pub mod identity;
pub mod session;
pub mod store;
pub mod submit;
pub mod sync;
pub mod timestamp;

pub use error::{
  AuthError, CreateEventError, Error, Result, SubmitError, SubscriptionError,
  ValidationError,
};
