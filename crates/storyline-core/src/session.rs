//! Play sessions and completion records.
//!
//! A session is a reader's position in a story's graph. Sessions are never
//! deleted by the engine; restarting creates a fresh one and leaves the old
//! one as history. Deleting a page strands the sessions standing on it: they
//! keep their history but can only be started over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a session stands in its traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
  /// The current page is not an ending.
  Active,
  /// The current page is an ending.
  Complete,
}

impl SessionState {
  pub fn for_page(is_ending: bool) -> Self {
    if is_ending { Self::Complete } else { Self::Active }
  }

  pub fn is_complete(self) -> bool { matches!(self, Self::Complete) }
}

/// A reader's in-progress traversal of a story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaySession {
  /// Opaque session token.
  pub session_id:      Uuid,
  pub story_id:        Uuid,
  /// `None` once the page the session stood on has been deleted.
  pub current_page_id: Option<Uuid>,
  pub reader:          Option<String>,
  /// Derived from the current page's ending flag.
  pub state:           SessionState,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to [`crate::store::StoryStore::create_session`].
#[derive(Debug, Clone)]
pub struct NewSession {
  pub story_id:        Uuid,
  pub current_page_id: Uuid,
  pub reader:          Option<String>,
}

/// Marks that a reader reached a specific ending of a story.
///
/// At most one record exists per `(story, ending page, reader)`; an anonymous
/// reader counts as a single identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
  pub completion_id:  Uuid,
  pub story_id:       Uuid,
  pub ending_page_id: Uuid,
  pub reader:         Option<String>,
  pub recorded_at:    DateTime<Utc>,
}
