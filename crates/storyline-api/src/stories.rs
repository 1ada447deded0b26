//! Handlers for story endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/stories` | Published stories unless `?status=` says otherwise |
//! | `GET`    | `/stories/{id}` | 404 if not found |
//! | `GET`    | `/author/stories` | Every story; same filters |
//! | `POST`   | `/author/stories` | Body: [`NewStory`] |
//! | `PATCH`  | `/author/stories/{id}` | Body: [`StoryPatch`] |
//! | `DELETE` | `/author/stories/{id}` | Removes pages, choices and sessions too |
//! | `PUT`    | `/author/stories/{id}/start_page` | Body: `{"page_id": "<uuid>" \| null}` |
//! | `GET`    | `/author/stories/{id}/validate` | Graph lint report |
//! | `GET`    | `/author/stories/{id}/completions` | Recorded endings |
//! | `POST`   | `/author/import` | Body: TOML story document |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use storyline_core::{
  Error, PlayEngine,
  graph::{self, GraphReport},
  import::{StoryDocument, import_story},
  session::Completion,
  store::{StoryQuery, StoryStore},
  story::{NewStory, Story, StoryPatch, StoryStatus},
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub status: Option<StoryStatus>,
  /// Free-text filter over title and description.
  pub text:   Option<String>,
  pub tag:    Option<String>,
  pub author: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl ListParams {
  fn into_query(self, default_status: Option<StoryStatus>) -> StoryQuery {
    StoryQuery {
      status: self.status.or(default_status),
      text:   self.text,
      tag:    self.tag,
      author: self.author,
      limit:  self.limit,
      offset: self.offset,
    }
  }
}

/// `GET /stories`
pub async fn list<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Story>>, ApiError> {
  let query = params.into_query(Some(StoryStatus::Published));
  let stories = engine
    .store()
    .list_stories(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(stories))
}

/// `GET /author/stories`
pub async fn list_all<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Story>>, ApiError> {
  let query = params.into_query(None);
  let stories = engine
    .store()
    .list_stories(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(stories))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /stories/{id}`
pub async fn get_one<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Story>, ApiError> {
  let story = engine
    .store()
    .get_story(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(Error::StoryNotFound(id))?;
  Ok(Json(story))
}

// ─── Authoring ───────────────────────────────────────────────────────────────

/// `POST /author/stories`
pub async fn create<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Json(body): Json<NewStory>,
) -> Result<impl IntoResponse, ApiError> {
  let story = engine
    .store()
    .create_story(body)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(story_id = %story.story_id, title = %story.title, "story created");
  Ok((StatusCode::CREATED, Json(story)))
}

/// `PATCH /author/stories/{id}`
pub async fn update<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<StoryPatch>,
) -> Result<Json<Story>, ApiError> {
  let story = engine
    .store()
    .update_story(id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(story))
}

/// `DELETE /author/stories/{id}`
pub async fn delete<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  engine
    .store()
    .delete_story(id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct StartPageBody {
  pub page_id: Option<Uuid>,
}

/// `PUT /author/stories/{id}/start_page`
pub async fn set_start_page<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StartPageBody>,
) -> Result<Json<Story>, ApiError> {
  let story = engine
    .store()
    .set_start_page(id, body.page_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(story))
}

/// `GET /author/stories/{id}/validate`
pub async fn validate<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<GraphReport>, ApiError> {
  let snapshot = engine.graph().snapshot(id).await?;
  Ok(Json(graph::validate(&snapshot)))
}

/// `GET /author/stories/{id}/completions`
pub async fn completions<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Completion>>, ApiError> {
  let completions = engine
    .store()
    .list_completions(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(completions))
}

/// `POST /author/import`
pub async fn import<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  body: String,
) -> Result<impl IntoResponse, ApiError> {
  let doc = StoryDocument::from_toml(&body)?;
  let story = import_story(engine.store(), doc).await?;
  Ok((StatusCode::CREATED, Json(story)))
}
