//! Reader endpoints: starting, advancing and viewing play sessions.
//!
//! Every response is a [`SessionView`] (or a [`PageView`] for the start
//! preview) so a client can render without a second request.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use storyline_core::{
  PlayEngine,
  store::StoryStore,
  view::{PageView, SessionView},
};
use uuid::Uuid;

use crate::error::ApiError;

/// Optional body of the session-creating routes.
#[derive(Debug, Default, Deserialize)]
pub struct ReaderBody {
  pub reader: Option<String>,
}

/// `GET /stories/{id}/start`
pub async fn start_view<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(story_id): Path<Uuid>,
) -> Result<Json<PageView>, ApiError> {
  Ok(Json(engine.start_view(story_id).await?))
}

/// `POST /stories/{id}/sessions`
pub async fn start<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(story_id): Path<Uuid>,
  body: Option<Json<ReaderBody>>,
) -> Result<impl IntoResponse, ApiError> {
  let reader = body.and_then(|Json(b)| b.reader);
  let session = engine.start(story_id, reader).await?;
  let view = engine.session_view(session.session_id).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `POST /stories/{id}/restart`
pub async fn restart<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(story_id): Path<Uuid>,
  body: Option<Json<ReaderBody>>,
) -> Result<impl IntoResponse, ApiError> {
  let reader = body.and_then(|Json(b)| b.reader);
  let session = engine.restart(story_id, reader).await?;
  let view = engine.session_view(session.session_id).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /sessions/{id}`
pub async fn view<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(engine.session_view(session_id).await?))
}

/// `POST /sessions/{id}/choices/{choice_id}`
pub async fn advance<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path((session_id, choice_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SessionView>, ApiError> {
  engine.advance(session_id, choice_id).await?;
  Ok(Json(engine.session_view(session_id).await?))
}
