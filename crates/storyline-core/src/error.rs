//! Error types for `storyline-core`.
//!
//! Every invariant violation surfaces as its own variant so that transport
//! layers can react to it specifically. None of these are fatal to the
//! process.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("story not found: {0}")]
  StoryNotFound(Uuid),

  #[error("page not found: {0}")]
  PageNotFound(Uuid),

  #[error("choice not found: {0}")]
  ChoiceNotFound(Uuid),

  #[error("session not found: {0}")]
  SessionNotFound(Uuid),

  /// The page the session stood on was deleted; the reader has to start over.
  #[error("session {0} lost its page; start the story over")]
  SessionStranded(Uuid),

  /// The story has no start page designated.
  #[error("story {0} has no start page")]
  NoStartPage(Uuid),

  /// The story cannot be played until an author designates a start page.
  #[error("story {0} cannot be played: no start page is set")]
  InvalidStory(Uuid),

  /// The choice is not among the outgoing choices of the session's page.
  #[error("choice {choice_id} is not offered on page {page_id}")]
  InvalidChoice { page_id: Uuid, choice_id: Uuid },

  #[error("choice endpoints belong to different stories: {from_page} -> {to_page}")]
  CrossStoryEdge { from_page: Uuid, to_page: Uuid },

  #[error("page {page_id} does not belong to story {story_id}")]
  ForeignPage { story_id: Uuid, page_id: Uuid },

  #[error("page key {0:?} is already used in this story")]
  DuplicatePageKey(String),

  #[error("invalid input: {0}")]
  Validation(String),

  #[error("parse error: {0}")]
  Parse(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Convert a backend error into the core taxonomy.
  ///
  /// Used as `.map_err(Error::from_store)` so the target type is pinned.
  pub fn from_store<E: Into<Error>>(e: E) -> Self { e.into() }

  /// `true` for every "does not exist" outcome, including missing sessions
  /// and stories without a start page.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::StoryNotFound(_)
        | Self::PageNotFound(_)
        | Self::ChoiceNotFound(_)
        | Self::SessionNotFound(_)
        | Self::NoStartPage(_)
    )
  }
}

impl From<toml::de::Error> for Error {
  fn from(e: toml::de::Error) -> Self { Self::Parse(e.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
