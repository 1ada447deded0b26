//! HTTP server wiring for Storyline.
//!
//! Mounts the reader and authoring routers from `storyline-api` under `/api`,
//! guards the authoring half with HTTP Basic auth and adds request tracing.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware, routing::get};
use serde::Deserialize;
use storyline_core::{PlayEngine, store::StoryStore};
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_author};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `storyline.toml` and
/// `STORYLINE_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  /// Empty leaves the authoring routes open.
  #[serde(default)]
  pub auth_username:      String,
  #[serde(default)]
  pub auth_password_hash: String,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("storyline.db") }

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router.
///
/// With `auth` set, every `/api/author/*` route requires valid credentials.
pub fn router<S>(engine: PlayEngine<S>, auth: Option<AuthConfig>) -> Router
where
  S: StoryStore + 'static,
{
  let author = storyline_api::author_router(engine.clone());
  let author = match auth {
    Some(auth) => author.route_layer(middleware::from_fn_with_state(
      Arc::new(auth),
      require_author,
    )),
    None => author,
  };

  let api = Router::new()
    .merge(storyline_api::reader_router(engine))
    .nest("/author", author);

  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}
