//! Sign-in and sign-out flows.
//!
//! A successful sign-in records the user's profile under `users/{uid}` so the
//! rest of the system can show a name next to their events.

use tracing::{info, warn};

use crate::{
  AuthError,
  document::{FieldValue, Fields},
  identity::{Credentials, Identity, IdentityProvider, LOGIN_PATH, Navigator},
  store::EventStore,
};

pub const USERS_COLLECTION: &str = "users";

/// The profile document written on every sign-in.
pub fn profile_fields(identity: &Identity) -> Fields {
  let text = |v: &Option<String>| FieldValue::string(v.clone().unwrap_or_default());
  Fields::from([
    ("uid".to_owned(), FieldValue::string(identity.id.clone())),
    ("name".to_owned(), text(&identity.display_name)),
    ("email".to_owned(), text(&identity.email)),
    ("photoURL".to_owned(), text(&identity.photo_url)),
    ("createdAt".to_owned(), FieldValue::ServerTimestamp),
  ])
}

/// Sign in interactively, upsert the profile, and return the path to resume
/// at (`next`).
pub async fn sign_in<P, S>(
  provider: &P,
  store: &S,
  credentials: Credentials,
  next: &str,
) -> Result<String, AuthError>
where
  P: IdentityProvider,
  S: EventStore,
{
  let identity = provider
    .sign_in_interactive(credentials)
    .await
    .inspect_err(|e| warn!(error = %e, "sign-in failed"))?;

  store
    .write_merge(USERS_COLLECTION, &identity.id, profile_fields(&identity))
    .await
    .map_err(|e| {
      warn!(user = %identity.id, error = %e, "profile write failed");
      AuthError::Profile(Box::new(e))
    })?;

  info!(user = %identity.id, resume = %next, "signed in");
  Ok(next.to_owned())
}

/// Sign out and go to the login page.
pub async fn sign_out<P, N>(provider: &P, navigator: &mut N)
where
  P: IdentityProvider,
  N: Navigator + ?Sized,
{
  provider.sign_out().await;
  info!("signed out");
  navigator.navigate(LOGIN_PATH);
}
