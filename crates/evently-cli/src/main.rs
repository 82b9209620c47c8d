//! `evently` — terminal front-end for the Evently event store.
//!
//! # Usage
//!
//! ```
//! evently --config ~/.config/evently/config.toml
//! evently --user ada --open /events
//! ```
//!
//! # Password hash generation
//!
//! Accounts in the config file carry an argon2 PHC string. To generate one:
//!
//! ```
//! evently --hash-password
//! ```

mod app;
mod auth;
mod settings;
mod router;
mod ui;

use std::{
  fs::OpenOptions,
  io,
  path::{Path, PathBuf},
  sync::{Arc, Mutex},
  time::Duration,
};

use anyhow::{Context, Result};
use app::App;
use auth::LocalIdentityProvider;
use clap::Parser;
use settings::{AppConfig, expand_tilde};
use crossterm::{
  event::{self, Event, KeyEventKind},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use evently_core::timestamp::DateFormat;
use evently_store_sqlite::SqliteStore;
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "evently", version, about = "Create and follow your events from the terminal")]
struct Args {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", value_name = "FILE")]
  config: PathBuf,

  /// SQLite store to open, overriding `store_path`.
  #[arg(long, value_name = "PATH")]
  store: Option<PathBuf>,

  /// Start signed in as this configured user, overriding `remember_user`.
  #[arg(long)]
  user: Option<String>,

  /// Page to open first.
  #[arg(long, default_value = "/", value_name = "PATH")]
  open: String,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Helper mode: hash a password and exit.
  if args.hash_password {
    let password = read_password()?;
    println!("{}", auth::hash_password(&password)?);
    return Ok(());
  }

  let cfg = AppConfig::load(&args.config).context("failed to read config file")?;
  let date_format = DateFormat::parse(&cfg.date_format).context("invalid date_format")?;

  // The terminal belongs to the UI, so logs go to a file.
  init_tracing(&expand_tilde(&cfg.log_file))?;

  let store_path = expand_tilde(args.store.as_ref().unwrap_or(&cfg.store_path));
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  info!(store = %store_path.display(), "store opened");

  let remembered = args.user.or(cfg.remember_user);
  let provider = Arc::new(LocalIdentityProvider::new(cfg.accounts));
  provider.restore(remembered.as_deref());

  let mut app = App::new(Arc::new(store), provider, date_format, &args.open);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

fn init_tracing(path: &Path) -> Result<()> {
  let file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("failed to open log file {}", path.display()))?;

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(Mutex::new(file))
    .with_ansi(false)
    .init();
  Ok(())
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && key.kind == KeyEventKind::Press
      && !app.handle_key(key).await
    {
      break;
    }

    // Identity changes and live query snapshots land between keystrokes.
    app.pump();
  }

  info!("exiting");
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> Result<String> {
  use std::io::{BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
