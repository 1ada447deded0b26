//! Async HTTP client wrapping the Storyline reader API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Response};
use serde::{Serialize, de::DeserializeOwned};
use storyline_core::{story::Story, view::SessionView};
use uuid::Uuid;

/// Connection settings for the Storyline API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  /// Name recorded on sessions and completions; anonymous when empty.
  pub reader:   String,
}

#[derive(Serialize)]
struct ReaderBody<'a> {
  reader: Option<&'a str>,
}

/// Async HTTP client for the Storyline JSON API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn reader_body(&self) -> ReaderBody<'_> {
    let reader = self.config.reader.trim();
    ReaderBody { reader: (!reader.is_empty()).then_some(reader) }
  }

  /// Decode a successful response, or turn the API's error body into a
  /// readable message.
  async fn decode<T: DeserializeOwned>(what: &str, resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
      return resp.json().await.with_context(|| format!("deserialising {what}"));
    }
    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    let message = body["message"].as_str().unwrap_or("request failed");
    Err(anyhow!("{what} → {status}: {message}"))
  }

  // ── Stories ───────────────────────────────────────────────────────────

  /// `GET /api/stories`
  pub async fn list_stories(&self) -> Result<Vec<Story>> {
    tracing::debug!("listing stories");
    let resp = self
      .client
      .get(self.url("/stories"))
      .send()
      .await
      .context("GET /stories failed")?;
    Self::decode("stories", resp).await
  }

  // ── Sessions ──────────────────────────────────────────────────────────

  /// `POST /api/stories/{id}/sessions`
  pub async fn start(&self, story_id: Uuid) -> Result<SessionView> {
    tracing::debug!(%story_id, "starting session");
    let resp = self
      .client
      .post(self.url(&format!("/stories/{story_id}/sessions")))
      .json(&self.reader_body())
      .send()
      .await
      .context("POST /sessions failed")?;
    Self::decode("session", resp).await
  }

  /// `POST /api/stories/{id}/restart`
  pub async fn restart(&self, story_id: Uuid) -> Result<SessionView> {
    tracing::debug!(%story_id, "restarting story");
    let resp = self
      .client
      .post(self.url(&format!("/stories/{story_id}/restart")))
      .json(&self.reader_body())
      .send()
      .await
      .context("POST /restart failed")?;
    Self::decode("session", resp).await
  }

  /// `POST /api/sessions/{id}/choices/{choice_id}`
  pub async fn choose(&self, session_id: Uuid, choice_id: Uuid) -> Result<SessionView> {
    tracing::debug!(%session_id, %choice_id, "advancing");
    let resp = self
      .client
      .post(self.url(&format!("/sessions/{session_id}/choices/{choice_id}")))
      .send()
      .await
      .context("POST /choices failed")?;
    Self::decode("session", resp).await
  }
}
