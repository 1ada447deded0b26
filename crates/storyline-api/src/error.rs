//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use storyline_core::Error as CoreError;
use thiserror::Error;

/// An error returned by an API handler.
///
/// Request bodies and paths that fail to parse are rejected by axum's
/// extractors before a handler runs, so every handler error is a core one.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] CoreError);

impl ApiError {
  /// Wrap a backend error, pinning it to the core taxonomy.
  pub fn store<E: Into<CoreError>>(e: E) -> Self { Self(e.into()) }

  pub fn status(&self) -> StatusCode {
    let e = &self.0;
    if e.is_not_found() {
      return StatusCode::NOT_FOUND;
    }
    match e {
      CoreError::InvalidStory(_)
      | CoreError::SessionStranded(_)
      | CoreError::DuplicatePageKey(_) => StatusCode::CONFLICT,
      CoreError::InvalidChoice { .. }
      | CoreError::CrossStoryEdge { .. }
      | CoreError::ForeignPage { .. }
      | CoreError::Validation(_)
      | CoreError::Parse(_) => StatusCode::BAD_REQUEST,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Machine-readable error code sent alongside the message.
  pub fn code(&self) -> &'static str {
    match &self.0 {
      CoreError::StoryNotFound(_) => "story_not_found",
      CoreError::PageNotFound(_) => "page_not_found",
      CoreError::ChoiceNotFound(_) => "choice_not_found",
      CoreError::SessionNotFound(_) => "session_not_found",
      CoreError::SessionStranded(_) => "session_stranded",
      CoreError::NoStartPage(_) => "no_start_page",
      CoreError::InvalidStory(_) => "invalid_story",
      CoreError::InvalidChoice { .. } => "invalid_choice",
      CoreError::CrossStoryEdge { .. } => "cross_story_edge",
      CoreError::ForeignPage { .. } => "foreign_page",
      CoreError::DuplicatePageKey(_) => "duplicate_page_key",
      CoreError::Validation(_) => "validation",
      CoreError::Parse(_) => "parse",
      CoreError::Store(_) => "store",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let body = json!({ "error": self.code(), "message": self.to_string() });
    (status, Json(body)).into_response()
  }
}
