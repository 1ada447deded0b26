//! Stories, pages and choices: the narrative graph.
//!
//! A story owns its pages; a page owns its outgoing choices. A choice is a
//! directed edge between two pages of the same story and owns neither
//! endpoint. The graph may contain cycles; only the `is_ending` flag makes a
//! page terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Story ───────────────────────────────────────────────────────────────────

/// Publication lifecycle of a story.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StoryStatus {
  #[default]
  Draft,
  Published,
  Suspended,
}

impl StoryStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Draft => "draft",
      Self::Published => "published",
      Self::Suspended => "suspended",
    }
  }
}

impl std::str::FromStr for StoryStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "draft" => Ok(Self::Draft),
      "published" => Ok(Self::Published),
      "suspended" => Ok(Self::Suspended),
      other => Err(Error::Validation(format!("unknown story status: {other:?}"))),
    }
  }
}

/// A complete branching narrative; the container for pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
  pub story_id:      Uuid,
  pub title:         String,
  pub description:   Option<String>,
  /// Identity of the author, as supplied by the identity provider.
  pub author:        Option<String>,
  pub status:        StoryStatus,
  pub tags:          Vec<String>,
  /// The page every new session starts on. Always a page of this story.
  pub start_page_id: Option<Uuid>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::StoryStore::create_story`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStory {
  pub title:       String,
  pub description: Option<String>,
  pub author:      Option<String>,
  #[serde(default)]
  pub status:      StoryStatus,
  #[serde(default)]
  pub tags:        Vec<String>,
}

impl NewStory {
  pub fn new(title: impl Into<String>) -> Self {
    Self { title: title.into(), ..Self::default() }
  }

  pub fn validate(&self) -> Result<()> { require_text("title", &self.title) }
}

/// Partial update of a story. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryPatch {
  pub title:       Option<String>,
  /// An empty string clears the description.
  pub description: Option<String>,
  pub status:      Option<StoryStatus>,
  pub tags:        Option<Vec<String>>,
}

impl StoryPatch {
  pub fn validate(&self) -> Result<()> {
    match &self.title {
      Some(t) => require_text("title", t),
      None => Ok(()),
    }
  }
}

// ─── Page ────────────────────────────────────────────────────────────────────

/// A node of the narrative graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
  pub page_id:      Uuid,
  pub story_id:     Uuid,
  /// Unique within the owning story.
  pub key:          String,
  pub content:      String,
  /// Derived from the owning story's start pointer; never stored on the page.
  pub is_start:     bool,
  pub is_ending:    bool,
  pub ending_label: Option<String>,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::StoryStore::create_page`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPage {
  pub story_id:     Uuid,
  /// Assigned from the page id when absent.
  pub key:          Option<String>,
  pub content:      String,
  /// Point the story's start pointer at this page once it is created.
  #[serde(default)]
  pub is_start:     bool,
  #[serde(default)]
  pub is_ending:    bool,
  pub ending_label: Option<String>,
}

impl NewPage {
  pub fn new(story_id: Uuid, key: impl Into<String>, content: impl Into<String>) -> Self {
    Self {
      story_id,
      key: Some(key.into()),
      content: content.into(),
      ..Self::default()
    }
  }

  pub fn start(mut self) -> Self {
    self.is_start = true;
    self
  }

  pub fn ending(mut self, label: Option<&str>) -> Self {
    self.is_ending = true;
    self.ending_label = label.map(str::to_owned);
    self
  }

  pub fn validate(&self) -> Result<()> {
    require_text("content", &self.content)?;
    match &self.key {
      Some(k) => require_text("key", k),
      None => Ok(()),
    }
  }
}

/// Partial update of a page. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PagePatch {
  pub key:          Option<String>,
  pub content:      Option<String>,
  pub is_ending:    Option<bool>,
  /// An empty string clears the label.
  pub ending_label: Option<String>,
}

impl PagePatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(k) = &self.key {
      require_text("key", k)?;
    }
    if let Some(c) = &self.content {
      require_text("content", c)?;
    }
    Ok(())
  }
}

// ─── Choice ──────────────────────────────────────────────────────────────────

/// A directed edge from one page to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
  pub choice_id:    Uuid,
  pub from_page_id: Uuid,
  pub to_page_id:   Uuid,
  pub text:         String,
  /// Presentation order; ascending.
  pub order:        i32,
  /// Side-effect hook reserved for scoring. Traversal ignores it.
  pub time_change:  i32,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::StoryStore::create_choice`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewChoice {
  pub from_page_id: Uuid,
  pub to_page_id:   Uuid,
  pub text:         String,
  #[serde(default)]
  pub order:        i32,
  #[serde(default)]
  pub time_change:  i32,
}

impl NewChoice {
  pub fn new(from_page_id: Uuid, to_page_id: Uuid, text: impl Into<String>, order: i32) -> Self {
    Self {
      from_page_id,
      to_page_id,
      text: text.into(),
      order,
      time_change: 0,
    }
  }

  pub fn validate(&self) -> Result<()> { require_text("text", &self.text) }
}

/// Partial update of a choice. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoicePatch {
  pub text:        Option<String>,
  pub to_page_id:  Option<Uuid>,
  pub order:       Option<i32>,
  pub time_change: Option<i32>,
}

impl ChoicePatch {
  pub fn validate(&self) -> Result<()> {
    match &self.text {
      Some(t) => require_text("text", t),
      None => Ok(()),
    }
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn require_text(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::Validation(format!("{field} must not be empty")));
  }
  Ok(())
}

/// Normalise an optional free-text field: blank means "absent".
pub fn non_blank(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}
