//! Conversions between domain types and the plain-text values stored in
//! SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings and
//! tags a compact JSON array. Booleans use SQLite's integer affinity.

use chrono::{DateTime, Utc};
use storyline_core::{
  session::{Completion, PlaySession, SessionState},
  story::{Choice, Page, Story, StoryStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_status(s: &str) -> Result<StoryStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown story status: {s:?}")))
}

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Story columns in the order [`RawStory::from_row`] reads them.
pub const STORY_COLUMNS: &str = "story_id, title, description, author, status, tags, \
                                 start_page_id, created_at, updated_at";

pub struct RawStory {
  pub story_id:      String,
  pub title:         String,
  pub description:   Option<String>,
  pub author:        Option<String>,
  pub status:        String,
  pub tags:          String,
  pub start_page_id: Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawStory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      story_id:      row.get(0)?,
      title:         row.get(1)?,
      description:   row.get(2)?,
      author:        row.get(3)?,
      status:        row.get(4)?,
      tags:          row.get(5)?,
      start_page_id: row.get(6)?,
      created_at:    row.get(7)?,
      updated_at:    row.get(8)?,
    })
  }

  pub fn into_story(self) -> Result<Story> {
    Ok(Story {
      story_id:      decode_uuid(&self.story_id)?,
      title:         self.title,
      description:   self.description,
      author:        self.author,
      status:        decode_status(&self.status)?,
      tags:          decode_tags(&self.tags)?,
      start_page_id: self.start_page_id.as_deref().map(decode_uuid).transpose()?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Page columns joined with the owning story so `is_start` can be derived
/// from the story's start pointer.
pub const PAGE_SELECT: &str = "
  SELECT p.page_id, p.story_id, p.page_key, p.content, p.is_ending,
         p.ending_label, p.created_at,
         COALESCE(s.start_page_id = p.page_id, 0)
    FROM pages p
    JOIN stories s ON s.story_id = p.story_id";

pub struct RawPage {
  pub page_id:      String,
  pub story_id:     String,
  pub key:          String,
  pub content:      String,
  pub is_ending:    bool,
  pub ending_label: Option<String>,
  pub created_at:   String,
  pub is_start:     bool,
}

impl RawPage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      page_id:      row.get(0)?,
      story_id:     row.get(1)?,
      key:          row.get(2)?,
      content:      row.get(3)?,
      is_ending:    row.get(4)?,
      ending_label: row.get(5)?,
      created_at:   row.get(6)?,
      is_start:     row.get(7)?,
    })
  }

  pub fn into_page(self) -> Result<Page> {
    Ok(Page {
      page_id:      decode_uuid(&self.page_id)?,
      story_id:     decode_uuid(&self.story_id)?,
      key:          self.key,
      content:      self.content,
      is_start:     self.is_start,
      is_ending:    self.is_ending,
      ending_label: self.ending_label,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const CHOICE_SELECT: &str = "
  SELECT c.choice_id, c.from_page_id, c.to_page_id, c.choice_text,
         c.choice_order, c.time_change, c.created_at
    FROM choices c";

pub struct RawChoice {
  pub choice_id:    String,
  pub from_page_id: String,
  pub to_page_id:   String,
  pub text:         String,
  pub order:        i32,
  pub time_change:  i32,
  pub created_at:   String,
}

impl RawChoice {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      choice_id:    row.get(0)?,
      from_page_id: row.get(1)?,
      to_page_id:   row.get(2)?,
      text:         row.get(3)?,
      order:        row.get(4)?,
      time_change:  row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_choice(self) -> Result<Choice> {
    Ok(Choice {
      choice_id:    decode_uuid(&self.choice_id)?,
      from_page_id: decode_uuid(&self.from_page_id)?,
      to_page_id:   decode_uuid(&self.to_page_id)?,
      text:         self.text,
      order:        self.order,
      time_change:  self.time_change,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Session columns joined with the current page so the state can be derived
/// from its ending flag. A session whose page was deleted still loads.
pub const SESSION_SELECT: &str = "
  SELECT se.session_id, se.story_id, se.current_page_id, se.reader,
         se.created_at, se.updated_at, COALESCE(p.is_ending, 0)
    FROM sessions se
    LEFT JOIN pages p ON p.page_id = se.current_page_id";

pub struct RawSession {
  pub session_id:      String,
  pub story_id:        String,
  pub current_page_id: Option<String>,
  pub reader:          Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
  pub on_ending:       bool,
}

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:      row.get(0)?,
      story_id:        row.get(1)?,
      current_page_id: row.get(2)?,
      reader:          row.get(3)?,
      created_at:      row.get(4)?,
      updated_at:      row.get(5)?,
      on_ending:       row.get(6)?,
    })
  }

  pub fn into_session(self) -> Result<PlaySession> {
    Ok(PlaySession {
      session_id:      decode_uuid(&self.session_id)?,
      story_id:        decode_uuid(&self.story_id)?,
      current_page_id: self.current_page_id.as_deref().map(decode_uuid).transpose()?,
      reader:          self.reader,
      state:           SessionState::for_page(self.on_ending),
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawCompletion {
  pub completion_id:  String,
  pub story_id:       String,
  pub ending_page_id: String,
  pub reader:         Option<String>,
  pub recorded_at:    String,
}

impl RawCompletion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      completion_id:  row.get(0)?,
      story_id:       row.get(1)?,
      ending_page_id: row.get(2)?,
      reader:         row.get(3)?,
      recorded_at:    row.get(4)?,
    })
  }

  pub fn into_completion(self) -> Result<Completion> {
    Ok(Completion {
      completion_id:  decode_uuid(&self.completion_id)?,
      story_id:       decode_uuid(&self.story_id)?,
      ending_page_id: decode_uuid(&self.ending_page_id)?,
      reader:         self.reader,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}
