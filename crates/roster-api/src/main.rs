//! Roster server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the
//! SQLite store, seeds the departments and — when no active admin exists —
//! the configured bootstrap admin, then serves the JSON API.
//!
//! # Password hash generation
//!
//! To generate an argon2 PHC string for seeding or scripting:
//!
//! ```
//! cargo run -p roster-api --bin server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;
use roster_api::{AppState, ServerConfig, auth, mailer::LogMailer};
use roster_core::{Error as CoreError, account::NewAccount, role::Role, store::DirectoryStore};
use roster_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Departments available at registration time.
const SEED_DEPARTMENTS: [&str; 4] = ["Management", "Security", "Kitchen", "Staff"];

#[derive(Parser)]
#[command(author, version, about = "Roster directory server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password_from_stdin()?;
    println!("{}", auth::hash_password(&password)?);
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ROSTER"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  bootstrap(&store, &server_cfg).await?;

  let state = AppState {
    store:  Arc::new(store),
    mailer: Arc::new(LogMailer),
  };

  let app = roster_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Seed the departments and, when no active admin exists, the configured
/// bootstrap admin — the last-active-admin invariant has to start
/// satisfiable.
async fn bootstrap(store: &SqliteStore, cfg: &ServerConfig) -> anyhow::Result<()> {
  for name in SEED_DEPARTMENTS {
    store.ensure_department(name.to_string()).await?;
  }

  let now = Utc::now();
  if store.active_admin_count(now).await? > 0 {
    return Ok(());
  }

  let Some(admin) = &cfg.bootstrap_admin else {
    tracing::warn!(
      "no active admin exists and no bootstrap_admin is configured; \
       admin-only endpoints are unreachable"
    );
    return Ok(());
  };

  let management = store.ensure_department("Management".to_string()).await?;
  let account = match store
    .create_account(NewAccount {
      name:          admin.name.clone(),
      email:         admin.email.clone(),
      password_hash: auth::hash_password(&admin.password)?,
      department_id: management.id,
    })
    .await
  {
    Ok(account) => account,
    // The account row may already exist (e.g. an admin whose role was
    // stripped while suspended); promote it instead.
    Err(CoreError::NameTaken(_) | CoreError::EmailTaken(_)) => store
      .find_account_by_email(admin.email.clone())
      .await?
      .context("bootstrap admin name is taken by a different email")?,
    Err(e) => return Err(e.into()),
  };

  store.sync_roles(account.id, vec![Role::Admin], now).await?;
  tracing::info!(name = %admin.name, "seeded bootstrap admin");
  Ok(())
}

/// Read a password from stdin.
fn read_password_from_stdin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
