//! The `StoryStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `storyline-store-sqlite`).
//! Higher layers (the play engine, `storyline-api`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  session::{Completion, NewSession, PlaySession},
  story::{
    Choice, ChoicePatch, NewChoice, NewPage, NewStory, Page, PagePatch, Story,
    StoryPatch, StoryStatus,
  },
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`StoryStore::list_stories`]. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct StoryQuery {
  pub status: Option<StoryStatus>,
  /// Free-text filter over title and description.
  pub text:   Option<String>,
  /// Only stories carrying this tag.
  pub tag:    Option<String>,
  pub author: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Storyline persistence backend.
///
/// Implementations enforce the graph's write-time invariants:
///
/// - a story's start page is always one of its own pages;
/// - both endpoints of a choice belong to the same story, checked with
///   [`crate::graph::validate_same_story`] and inserted atomically;
/// - page keys are unique within a story;
/// - deleting a story removes its pages, deleting a page removes the choices
///   touching it;
/// - completions are first-write-wins per `(story, ending page, reader)`.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait StoryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Stories ───────────────────────────────────────────────────────────

  fn create_story(
    &self,
    input: NewStory,
  ) -> impl Future<Output = Result<Story, Self::Error>> + Send + '_;

  /// Retrieve a story by id. Returns `None` if not found.
  fn get_story(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Story>, Self::Error>> + Send + '_;

  fn list_stories<'a>(
    &'a self,
    query: &'a StoryQuery,
  ) -> impl Future<Output = Result<Vec<Story>, Self::Error>> + Send + 'a;

  fn update_story(
    &self,
    id: Uuid,
    patch: StoryPatch,
  ) -> impl Future<Output = Result<Story, Self::Error>> + Send + '_;

  /// Point the story at its start page, or clear the pointer with `None`.
  /// Fails if the page belongs to a different story.
  fn set_start_page(
    &self,
    story_id: Uuid,
    page_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Story, Self::Error>> + Send + '_;

  /// Delete a story together with its pages, choices and sessions.
  fn delete_story(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Pages ─────────────────────────────────────────────────────────────

  fn create_page(
    &self,
    input: NewPage,
  ) -> impl Future<Output = Result<Page, Self::Error>> + Send + '_;

  fn get_page(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Page>, Self::Error>> + Send + '_;

  /// All pages of a story in creation order.
  fn list_pages(
    &self,
    story_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Page>, Self::Error>> + Send + '_;

  fn update_page(
    &self,
    id: Uuid,
    patch: PagePatch,
  ) -> impl Future<Output = Result<Page, Self::Error>> + Send + '_;

  fn delete_page(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Choices ───────────────────────────────────────────────────────────

  /// Persist a choice. Fails without writing anything if the endpoints are in
  /// different stories.
  fn create_choice(
    &self,
    input: NewChoice,
  ) -> impl Future<Output = Result<Choice, Self::Error>> + Send + '_;

  fn get_choice(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Choice>, Self::Error>> + Send + '_;

  /// Outgoing choices of a page, ascending by `order`; equal orders keep
  /// insertion order.
  fn list_choices(
    &self,
    page_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Choice>, Self::Error>> + Send + '_;

  /// Every choice whose source page belongs to the story.
  fn list_story_choices(
    &self,
    story_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Choice>, Self::Error>> + Send + '_;

  fn update_choice(
    &self,
    id: Uuid,
    patch: ChoicePatch,
  ) -> impl Future<Output = Result<Choice, Self::Error>> + Send + '_;

  fn delete_choice(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn create_session(
    &self,
    input: NewSession,
  ) -> impl Future<Output = Result<PlaySession, Self::Error>> + Send + '_;

  fn get_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<PlaySession>, Self::Error>> + Send + '_;

  /// Move a session to `page_id`. Concurrent writers race; the last one wins.
  fn set_session_page(
    &self,
    session_id: Uuid,
    page_id: Uuid,
  ) -> impl Future<Output = Result<PlaySession, Self::Error>> + Send + '_;

  // ── Completions ───────────────────────────────────────────────────────

  /// Record that `reader` reached `ending_page_id`. Returns `true` if a new
  /// record was written, `false` if one already existed.
  fn record_completion(
    &self,
    story_id: Uuid,
    ending_page_id: Uuid,
    reader: Option<String>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_completions(
    &self,
    story_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Completion>, Self::Error>> + Send + '_;
}
