//! storyline-server binary.
//!
//! Reads `storyline.toml` (or the path given with `--config`), opens the
//! SQLite story store, and serves the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash`:
//!
//! ```text
//! cargo run -p storyline-server -- --hash-password
//! ```
//!
//! # Importing a story
//!
//! ```text
//! cargo run -p storyline-server -- --import demos/exam_day.toml
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use rand_core::OsRng;
use storyline_core::{
  PlayEngine,
  import::{StoryDocument, import_story},
};
use storyline_server::{ServerConfig, auth::AuthConfig};
use storyline_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Storyline interactive fiction server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "storyline.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Import a TOML story document into the store and exit.
  #[arg(long, value_name = "FILE")]
  import: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("STORYLINE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(path) = cli.import {
    let raw = std::fs::read_to_string(&path)
      .with_context(|| format!("failed to read {path:?}"))?;
    let doc = StoryDocument::from_toml(&raw)
      .with_context(|| format!("failed to parse {path:?}"))?;
    let story = import_story(&store, doc)
      .await
      .with_context(|| format!("failed to import {path:?}"))?;
    println!("{}\t{}", story.story_id, story.title);
    return Ok(());
  }

  let auth = AuthConfig::from_server_config(&server_cfg);
  if auth.is_none() {
    tracing::warn!("auth_username is not set; authoring routes are open to anyone");
  }

  let engine = PlayEngine::new(Arc::new(store));
  let app = storyline_server::router(engine, auth);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(store = %store_path.display(), "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
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
