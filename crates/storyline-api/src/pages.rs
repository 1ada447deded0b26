//! Handlers for page endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/pages/{id}` | Page content with its choices |
//! | `GET`    | `/author/stories/{id}/pages` | All pages of a story |
//! | `POST`   | `/author/stories/{id}/pages` | Body: [`CreateBody`] |
//! | `GET`    | `/author/pages/{id}` | Raw page record |
//! | `PATCH`  | `/author/pages/{id}` | Body: [`PagePatch`] |
//! | `DELETE` | `/author/pages/{id}` | Removes choices into and out of the page |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use storyline_core::{
  Error, PlayEngine,
  store::StoryStore,
  story::{NewPage, Page, PagePatch},
  view::PageView,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /pages/{id}`
pub async fn view<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PageView>, ApiError> {
  Ok(Json(engine.page_view(id).await?))
}

/// `GET /author/stories/{id}/pages`
pub async fn list<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(story_id): Path<Uuid>,
) -> Result<Json<Vec<Page>>, ApiError> {
  let pages = engine
    .store()
    .list_pages(story_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(pages))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub key:          Option<String>,
  pub content:      String,
  #[serde(default)]
  pub is_start:     bool,
  #[serde(default)]
  pub is_ending:    bool,
  pub ending_label: Option<String>,
}

/// `POST /author/stories/{id}/pages`
pub async fn create<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(story_id): Path<Uuid>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let page = engine
    .store()
    .create_page(NewPage {
      story_id,
      key: body.key,
      content: body.content,
      is_start: body.is_start,
      is_ending: body.is_ending,
      ending_label: body.ending_label,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(page)))
}

/// `GET /author/pages/{id}`
pub async fn get_one<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Page>, ApiError> {
  let page = engine
    .store()
    .get_page(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(Error::PageNotFound(id))?;
  Ok(Json(page))
}

/// `PATCH /author/pages/{id}`
pub async fn update<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<PagePatch>,
) -> Result<Json<Page>, ApiError> {
  let page = engine
    .store()
    .update_page(id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(page))
}

/// `DELETE /author/pages/{id}`
pub async fn delete<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  engine
    .store()
    .delete_page(id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
