//! Handlers for choice endpoints. All of them are authoring routes; readers
//! see choices through page and session views.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/author/pages/{id}/choices` | Outgoing choices in presentation order |
//! | `POST`   | `/author/pages/{id}/choices` | Body: [`CreateBody`]; 400 across stories |
//! | `GET`    | `/author/choices/{id}` | 404 if not found |
//! | `PATCH`  | `/author/choices/{id}` | Body: [`ChoicePatch`] |
//! | `DELETE` | `/author/choices/{id}` | |

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
  story::{Choice, ChoicePatch, NewChoice},
};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /author/pages/{id}/choices`
pub async fn list<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(page_id): Path<Uuid>,
) -> Result<Json<Vec<Choice>>, ApiError> {
  Ok(Json(engine.graph().get_choices(page_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub to_page_id:  Uuid,
  pub text:        String,
  #[serde(default)]
  pub order:       i32,
  #[serde(default)]
  pub time_change: i32,
}

/// `POST /author/pages/{id}/choices`
pub async fn create<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(from_page_id): Path<Uuid>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let choice = engine
    .store()
    .create_choice(NewChoice {
      from_page_id,
      to_page_id: body.to_page_id,
      text: body.text,
      order: body.order,
      time_change: body.time_change,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(choice)))
}

/// `GET /author/choices/{id}`
pub async fn get_one<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Choice>, ApiError> {
  let choice = engine
    .store()
    .get_choice(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(Error::ChoiceNotFound(id))?;
  Ok(Json(choice))
}

/// `PATCH /author/choices/{id}`
pub async fn update<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<ChoicePatch>,
) -> Result<Json<Choice>, ApiError> {
  let choice = engine
    .store()
    .update_choice(id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(choice))
}

/// `DELETE /author/choices/{id}`
pub async fn delete<S: StoryStore + 'static>(
  State(engine): State<PlayEngine<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  engine
    .store()
    .delete_choice(id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
