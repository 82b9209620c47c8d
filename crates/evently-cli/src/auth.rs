//! Local identity provider: argon2-verified accounts from the config file.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use evently_core::{
  AuthError,
  identity::{Credentials, Identity, IdentityProvider, IdentityState},
};
use rand_core::OsRng;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::settings::AccountConfig;

#[derive(Debug, thiserror::Error)]
#[error("stored password hash for {username:?} is malformed: {reason}")]
struct MalformedHash {
  username: String,
  reason:   String,
}

/// Hash `password` into an argon2 PHC string suitable for `password_hash`.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string(),
  )
}

impl AccountConfig {
  fn identity(&self) -> Identity {
    Identity {
      id:           self.username.clone(),
      display_name: self.display_name.clone(),
      email:        self.email.clone(),
      photo_url:    self.photo_url.clone(),
    }
  }
}

pub struct LocalIdentityProvider {
  accounts: Vec<AccountConfig>,
  state:    watch::Sender<IdentityState>,
}

impl LocalIdentityProvider {
  /// A provider that has not resolved yet; call [`Self::restore`].
  pub fn new(accounts: Vec<AccountConfig>) -> Self {
    let (state, _) = watch::channel(IdentityState::Unknown);
    Self { accounts, state }
  }

  /// Resolve the startup session: the remembered user if it still has an
  /// account, otherwise signed out.
  pub fn restore(&self, remembered: Option<&str>) {
    let state = match remembered.and_then(|u| self.find(u)) {
      Some(account) => {
        info!(user = %account.username, "restored session");
        IdentityState::Present(account.identity())
      }
      None => IdentityState::Absent,
    };
    self.state.send_replace(state);
  }

  fn find(&self, username: &str) -> Option<&AccountConfig> {
    self.accounts.iter().find(|a| a.username == username)
  }

  fn verify(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
    if credentials.password.is_empty() {
      return Err(AuthError::Cancelled);
    }
    let account = self.find(&credentials.username).ok_or(AuthError::Rejected)?;

    let parsed = PasswordHash::new(&account.password_hash).map_err(|e| {
      AuthError::Provider(Box::new(MalformedHash {
        username: account.username.clone(),
        reason:   e.to_string(),
      }))
    })?;

    Argon2::default()
      .verify_password(credentials.password.as_bytes(), &parsed)
      .map_err(|_| AuthError::Rejected)?;

    Ok(account.identity())
  }
}

impl IdentityProvider for LocalIdentityProvider {
  fn subscribe(&self) -> watch::Receiver<IdentityState> { self.state.subscribe() }

  async fn sign_in_interactive(&self, credentials: Credentials) -> Result<Identity, AuthError> {
    let identity = self
      .verify(&credentials)
      .inspect_err(|e| warn!(user = %credentials.username, error = %e, "credentials refused"))?;
    self.state.send_replace(IdentityState::Present(identity.clone()));
    Ok(identity)
  }

  async fn sign_out(&self) { self.state.send_replace(IdentityState::Absent); }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn account(password: &str) -> AccountConfig {
    AccountConfig {
      username:      "user".to_string(),
      password_hash: hash_password(password).unwrap(),
      display_name:  Some("Test User".to_string()),
      email:         Some("user@example.com".to_string()),
      photo_url:     None,
    }
  }

  fn credentials(username: &str, password: &str) -> Credentials {
    Credentials {
      username: username.to_string(),
      password: password.to_string(),
    }
  }

  #[tokio::test]
  async fn valid_credentials_publish_identity() {
    let provider = LocalIdentityProvider::new(vec![account("secret")]);
    let rx = provider.subscribe();

    let identity = provider
      .sign_in_interactive(credentials("user", "secret"))
      .await
      .unwrap();
    assert_eq!(identity.id, "user");
    assert_eq!(identity.label(), "Test User");
    assert_eq!(*rx.borrow(), IdentityState::Present(identity));
  }

  #[tokio::test]
  async fn wrong_password_is_rejected() {
    let provider = LocalIdentityProvider::new(vec![account("secret")]);
    let result = provider.sign_in_interactive(credentials("user", "wrong")).await;
    assert!(matches!(result, Err(AuthError::Rejected)));
    assert_eq!(*provider.subscribe().borrow(), IdentityState::Unknown);
  }

  #[tokio::test]
  async fn unknown_user_is_rejected() {
    let provider = LocalIdentityProvider::new(vec![account("secret")]);
    let result = provider.sign_in_interactive(credentials("nobody", "secret")).await;
    assert!(matches!(result, Err(AuthError::Rejected)));
  }

  #[tokio::test]
  async fn empty_password_cancels() {
    let provider = LocalIdentityProvider::new(vec![account("secret")]);
    let result = provider.sign_in_interactive(credentials("user", "")).await;
    assert!(matches!(result, Err(AuthError::Cancelled)));
  }

  #[tokio::test]
  async fn malformed_hash_is_a_provider_error() {
    let mut broken = account("secret");
    broken.password_hash = "not-a-phc-string".to_string();
    let provider = LocalIdentityProvider::new(vec![broken]);
    let result = provider.sign_in_interactive(credentials("user", "secret")).await;
    assert!(matches!(result, Err(AuthError::Provider(_))));
  }

  #[tokio::test]
  async fn sign_out_publishes_absent() {
    let provider = LocalIdentityProvider::new(vec![account("secret")]);
    provider.sign_in_interactive(credentials("user", "secret")).await.unwrap();
    provider.sign_out().await;
    assert_eq!(*provider.subscribe().borrow(), IdentityState::Absent);
  }

  #[test]
  fn restore_remembered_or_absent() {
    let provider = LocalIdentityProvider::new(vec![account("secret")]);
    provider.restore(Some("user"));
    assert!(matches!(*provider.subscribe().borrow(), IdentityState::Present(_)));

    provider.restore(Some("ghost"));
    assert_eq!(*provider.subscribe().borrow(), IdentityState::Absent);

    provider.restore(None);
    assert_eq!(*provider.subscribe().borrow(), IdentityState::Absent);
  }
}
