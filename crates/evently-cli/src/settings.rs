//! Runtime configuration.
//!
//! Layered, lowest precedence first: built-in defaults, the TOML file given
//! with `--config`, then `EVENTLY_`-prefixed environment variables. CLI flags
//! override all of these in `main`.

use std::path::{Path, PathBuf};

use evently_core::timestamp::DEFAULT_DATE_FORMAT;
use serde::Deserialize;

/// One sign-in account for the local identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  #[serde(default)]
  pub display_name:  Option<String>,
  #[serde(default)]
  pub email:         Option<String>,
  #[serde(default)]
  pub photo_url:     Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  pub store_path:    PathBuf,
  pub log_file:      PathBuf,
  pub date_format:   String,
  /// Username whose session is restored at startup, if any.
  #[serde(default)]
  pub remember_user: Option<String>,
  #[serde(default)]
  pub accounts:      Vec<AccountConfig>,
}

impl AppConfig {
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("store_path", "~/.local/share/evently/events.db")?
      .set_default("log_file", "evently.log")?
      .set_default("date_format", DEFAULT_DATE_FORMAT)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("EVENTLY"))
      .build()?
      .try_deserialize()
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_uses_defaults() {
    let cfg = AppConfig::load(Path::new("/nonexistent/evently.toml")).unwrap();
    assert_eq!(cfg.date_format, DEFAULT_DATE_FORMAT);
    assert!(cfg.accounts.is_empty());
  }

  #[test]
  fn reads_accounts_from_toml() {
    let path = std::env::temp_dir().join(format!("evently-config-{}.toml", std::process::id()));
    std::fs::write(
      &path,
      r#"
store_path = "/tmp/events.db"
remember_user = "ada"

[[accounts]]
username = "ada"
password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"
display_name = "Ada Lovelace"
"#,
    )
    .unwrap();

    let cfg = AppConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.store_path, PathBuf::from("/tmp/events.db"));
    assert_eq!(cfg.remember_user.as_deref(), Some("ada"));
    assert_eq!(cfg.accounts.len(), 1);
    assert_eq!(cfg.accounts[0].display_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(cfg.accounts[0].email, None);
  }

  #[test]
  fn expands_home() {
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    }
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}
