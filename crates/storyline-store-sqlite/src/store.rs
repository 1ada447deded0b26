//! [`SqliteStore`], the SQLite implementation of [`StoryStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, params};
use uuid::Uuid;

use storyline_core::{
  Error as CoreError,
  graph::validate_same_story,
  session::{Completion, NewSession, PlaySession},
  store::{StoryQuery, StoryStore},
  story::{
    Choice, ChoicePatch, NewChoice, NewPage, NewStory, Page, PagePatch, Story, StoryPatch,
    non_blank,
  },
};

use crate::{
  Error, Result,
  encode::{
    CHOICE_SELECT, PAGE_SELECT, RawChoice, RawCompletion, RawPage, RawSession, RawStory,
    SESSION_SELECT, STORY_COLUMNS, decode_uuid, encode_dt, encode_tags, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Storyline story store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("sqlite schema ready");
    Ok(())
  }

  async fn fetch_page(&self, id: Uuid) -> Result<Page> {
    self
      .get_page(id)
      .await?
      .ok_or(Error::Core(CoreError::PageNotFound(id)))
  }

  async fn fetch_session(&self, id: Uuid) -> Result<PlaySession> {
    self
      .get_session(id)
      .await?
      .ok_or(Error::Core(CoreError::SessionNotFound(id)))
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn select_story(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<RawStory>> {
  conn
    .query_row(
      &format!("SELECT {STORY_COLUMNS} FROM stories WHERE story_id = ?1"),
      params![id],
      RawStory::from_row,
    )
    .optional()
}

fn select_page(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<RawPage>> {
  conn
    .query_row(
      &format!("{PAGE_SELECT} WHERE p.page_id = ?1"),
      params![id],
      RawPage::from_row,
    )
    .optional()
}

/// Whether another page of the story already uses `key`.
fn key_taken(
  conn: &rusqlite::Connection,
  story_id: &str,
  key: &str,
  except: Option<&str>,
) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS (
       SELECT 1 FROM pages
        WHERE story_id = ?1 AND page_key = ?2 AND page_id IS NOT ?3
     )",
    params![story_id, key, except],
    |r| r.get(0),
  )
}

/// Both endpoints must exist and belong to the same story.
fn check_edge(
  from_id: Uuid,
  from: Option<RawPage>,
  to_id: Uuid,
  to: Option<RawPage>,
) -> Result<()> {
  let from = from.ok_or(CoreError::PageNotFound(from_id))?.into_page()?;
  let to = to.ok_or(CoreError::PageNotFound(to_id))?.into_page()?;
  if !validate_same_story(&from, &to) {
    return Err(CoreError::CrossStoryEdge { from_page: from_id, to_page: to_id }.into());
  }
  Ok(())
}

/// Patch values for nullable text columns: `Some("")` clears the column.
fn clearable(value: Option<String>) -> Option<String> {
  value.map(|v| non_blank(Some(v)).unwrap_or_default())
}

/// Make user text literal inside a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

// ─── StoryStore impl ─────────────────────────────────────────────────────────

impl StoryStore for SqliteStore {
  type Error = Error;

  // ── Stories ───────────────────────────────────────────────────────────

  async fn create_story(&self, input: NewStory) -> Result<Story> {
    input.validate()?;

    let now = Utc::now();
    let story = Story {
      story_id:      Uuid::new_v4(),
      title:         input.title.trim().to_owned(),
      description:   non_blank(input.description),
      author:        non_blank(input.author),
      status:        input.status,
      tags:          input.tags,
      start_page_id: None,
      created_at:    now,
      updated_at:    now,
    };

    let id_str = encode_uuid(story.story_id);
    let title = story.title.clone();
    let description = story.description.clone();
    let author = story.author.clone();
    let status = story.status.as_str();
    let tags = encode_tags(&story.tags)?;
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO stories
             (story_id, title, description, author, status, tags, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          params![id_str, title, description, author, status, tags, at_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(story_id = %story.story_id, "story created");
    Ok(story)
  }

  async fn get_story(&self, id: Uuid) -> Result<Option<Story>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_story(conn, &id_str)?))
      .await?;
    raw.map(RawStory::into_story).transpose()
  }

  async fn list_stories<'a>(&'a self, query: &'a StoryQuery) -> Result<Vec<Story>> {
    let status = query.status.map(|s| s.as_str());
    let text = query
      .text
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .map(|t| format!("%{}%", escape_like(t)));
    let tag = query.tag.clone();
    let author = query.author.clone();
    let limit = query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset = query.offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));

    let raws: Vec<RawStory> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {STORY_COLUMNS} FROM stories s
            WHERE (?1 IS NULL OR s.status = ?1)
              AND (?2 IS NULL OR s.title LIKE ?2 ESCAPE '\\' OR s.description LIKE ?2 ESCAPE '\\')
              AND (?3 IS NULL OR EXISTS (SELECT 1 FROM json_each(s.tags) WHERE value = ?3))
              AND (?4 IS NULL OR s.author = ?4)
            ORDER BY s.created_at DESC, s.rowid DESC
            LIMIT ?5 OFFSET ?6"
        ))?;
        let rows = stmt
          .query_map(params![status, text, tag, author, limit, offset], RawStory::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStory::into_story).collect()
  }

  async fn update_story(&self, id: Uuid, patch: StoryPatch) -> Result<Story> {
    patch.validate()?;

    let id_str = encode_uuid(id);
    let title = patch.title.map(|t| t.trim().to_owned());
    let description = clearable(patch.description);
    let status = patch.status.map(|s| s.as_str());
    let tags = patch.tags.as_deref().map(encode_tags).transpose()?;
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE stories SET
             title       = COALESCE(?2, title),
             description = CASE WHEN ?3 IS NULL THEN description
                                WHEN ?3 = '' THEN NULL
                                ELSE ?3 END,
             status      = COALESCE(?4, status),
             tags        = COALESCE(?5, tags),
             updated_at  = ?6
           WHERE story_id = ?1",
          params![id_str, title, description, status, tags, at_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_story(conn, &id_str)?)
      })
      .await?;

    raw
      .ok_or(Error::Core(CoreError::StoryNotFound(id)))?
      .into_story()
  }

  async fn set_start_page(&self, story_id: Uuid, page_id: Option<Uuid>) -> Result<Story> {
    let story_str = encode_uuid(story_id);
    let page_str = page_id.map(encode_uuid);
    let at_str = encode_dt(Utc::now());

    let outcome: Result<RawStory> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if select_story(&tx, &story_str)?.is_none() {
          return Ok(Err(CoreError::StoryNotFound(story_id).into()));
        }
        if let (Some(page_id), Some(page_str)) = (page_id, page_str.as_deref()) {
          let owner: Option<String> = tx
            .query_row(
              "SELECT story_id FROM pages WHERE page_id = ?1",
              params![page_str],
              |r| r.get(0),
            )
            .optional()?;
          match owner {
            None => return Ok(Err(CoreError::PageNotFound(page_id).into())),
            Some(owner) if owner != story_str => {
              return Ok(Err(CoreError::ForeignPage { story_id, page_id }.into()));
            }
            Some(_) => {}
          }
        }
        tx.execute(
          "UPDATE stories SET start_page_id = ?2, updated_at = ?3 WHERE story_id = ?1",
          params![story_str, page_str, at_str],
        )?;
        let raw = select_story(&tx, &story_str)?;
        tx.commit()?;
        Ok(raw.ok_or(Error::Core(CoreError::StoryNotFound(story_id))))
      })
      .await?;

    let story = outcome?.into_story()?;
    tracing::debug!(%story_id, start_page = ?story.start_page_id, "start page set");
    Ok(story)
  }

  async fn delete_story(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM stories WHERE story_id = ?1", params![id_str])?)
      })
      .await?;

    if deleted == 0 {
      return Err(CoreError::StoryNotFound(id).into());
    }
    tracing::info!(story_id = %id, "story deleted");
    Ok(())
  }

  // ── Pages ─────────────────────────────────────────────────────────────

  async fn create_page(&self, input: NewPage) -> Result<Page> {
    input.validate()?;

    let page_id = Uuid::new_v4();
    let story_id = input.story_id;
    let key = input
      .key
      .map(|k| k.trim().to_owned())
      .unwrap_or_else(|| page_id.simple().to_string());

    let page_str = encode_uuid(page_id);
    let story_str = encode_uuid(story_id);
    let content = input.content;
    let is_start = input.is_start;
    let is_ending = input.is_ending;
    let ending_label = non_blank(input.ending_label);
    let at_str = encode_dt(Utc::now());

    let outcome: Result<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if select_story(&tx, &story_str)?.is_none() {
          return Ok(Err(CoreError::StoryNotFound(story_id).into()));
        }
        if key_taken(&tx, &story_str, &key, None)? {
          return Ok(Err(CoreError::DuplicatePageKey(key).into()));
        }
        tx.execute(
          "INSERT INTO pages
             (page_id, story_id, page_key, content, is_ending, ending_label, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![page_str, story_str, key, content, is_ending, ending_label, at_str],
        )?;
        if is_start {
          tx.execute(
            "UPDATE stories SET start_page_id = ?2, updated_at = ?3 WHERE story_id = ?1",
            params![story_str, page_str, at_str],
          )?;
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    outcome?;

    tracing::debug!(%page_id, %story_id, "page created");
    self.fetch_page(page_id).await
  }

  async fn get_page(&self, id: Uuid) -> Result<Option<Page>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_page(conn, &id_str)?))
      .await?;
    raw.map(RawPage::into_page).transpose()
  }

  async fn list_pages(&self, story_id: Uuid) -> Result<Vec<Page>> {
    let id_str = encode_uuid(story_id);
    let raws: Vec<RawPage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{PAGE_SELECT} WHERE p.story_id = ?1 ORDER BY p.created_at, p.rowid"
        ))?;
        let rows = stmt
          .query_map(params![id_str], RawPage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPage::into_page).collect()
  }

  async fn update_page(&self, id: Uuid, patch: PagePatch) -> Result<Page> {
    patch.validate()?;

    let id_str = encode_uuid(id);
    let key = patch.key.map(|k| k.trim().to_owned());
    let content = patch.content;
    let is_ending = patch.is_ending;
    let ending_label = clearable(patch.ending_label);

    let outcome: Result<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(page) = select_page(&tx, &id_str)? else {
          return Ok(Err(CoreError::PageNotFound(id).into()));
        };
        if let Some(key) = &key {
          if key_taken(&tx, &page.story_id, key, Some(&id_str))? {
            return Ok(Err(CoreError::DuplicatePageKey(key.clone()).into()));
          }
        }
        tx.execute(
          "UPDATE pages SET
             page_key     = COALESCE(?2, page_key),
             content      = COALESCE(?3, content),
             is_ending    = COALESCE(?4, is_ending),
             ending_label = CASE WHEN ?5 IS NULL THEN ending_label
                                 WHEN ?5 = '' THEN NULL
                                 ELSE ?5 END
           WHERE page_id = ?1",
          params![id_str, key, content, is_ending, ending_label],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    outcome?;

    self.fetch_page(id).await
  }

  async fn delete_page(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM pages WHERE page_id = ?1", params![id_str])?)
      })
      .await?;

    if deleted == 0 {
      return Err(CoreError::PageNotFound(id).into());
    }
    tracing::debug!(page_id = %id, "page deleted");
    Ok(())
  }

  // ── Choices ───────────────────────────────────────────────────────────

  async fn create_choice(&self, input: NewChoice) -> Result<Choice> {
    input.validate()?;

    let choice = Choice {
      choice_id:    Uuid::new_v4(),
      from_page_id: input.from_page_id,
      to_page_id:   input.to_page_id,
      text:         input.text.trim().to_owned(),
      order:        input.order,
      time_change:  input.time_change,
      created_at:   Utc::now(),
    };

    let (from_id, to_id) = (choice.from_page_id, choice.to_page_id);
    let id_str = encode_uuid(choice.choice_id);
    let from_str = encode_uuid(from_id);
    let to_str = encode_uuid(to_id);
    let text = choice.text.clone();
    let (order, time_change) = (choice.order, choice.time_change);
    let at_str = encode_dt(choice.created_at);

    let outcome: Result<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let from = select_page(&tx, &from_str)?;
        let to = select_page(&tx, &to_str)?;
        if let Err(e) = check_edge(from_id, from, to_id, to) {
          return Ok(Err(e));
        }
        tx.execute(
          "INSERT INTO choices
             (choice_id, from_page_id, to_page_id, choice_text, choice_order,
              time_change, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![id_str, from_str, to_str, text, order, time_change, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    if let Err(e) = outcome {
      tracing::warn!(from_page = %from_id, to_page = %to_id, error = %e, "choice refused");
      return Err(e);
    }
    Ok(choice)
  }

  async fn get_choice(&self, id: Uuid) -> Result<Option<Choice>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("{CHOICE_SELECT} WHERE c.choice_id = ?1"),
            params![id_str],
            RawChoice::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawChoice::into_choice).transpose()
  }

  async fn list_choices(&self, page_id: Uuid) -> Result<Vec<Choice>> {
    let id_str = encode_uuid(page_id);
    let raws: Vec<RawChoice> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{CHOICE_SELECT} WHERE c.from_page_id = ?1 ORDER BY c.choice_order, c.rowid"
        ))?;
        let rows = stmt
          .query_map(params![id_str], RawChoice::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawChoice::into_choice).collect()
  }

  async fn list_story_choices(&self, story_id: Uuid) -> Result<Vec<Choice>> {
    let id_str = encode_uuid(story_id);
    let raws: Vec<RawChoice> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{CHOICE_SELECT}
             JOIN pages p ON p.page_id = c.from_page_id
            WHERE p.story_id = ?1
            ORDER BY c.from_page_id, c.choice_order, c.rowid"
        ))?;
        let rows = stmt
          .query_map(params![id_str], RawChoice::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawChoice::into_choice).collect()
  }

  async fn update_choice(&self, id: Uuid, patch: ChoicePatch) -> Result<Choice> {
    patch.validate()?;

    let id_str = encode_uuid(id);
    let text = patch.text.map(|t| t.trim().to_owned());
    let to_page_id = patch.to_page_id;
    let to_str = to_page_id.map(encode_uuid);
    let (order, time_change) = (patch.order, patch.time_change);

    let outcome: Result<Option<RawChoice>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current: Option<String> = tx
          .query_row(
            "SELECT from_page_id FROM choices WHERE choice_id = ?1",
            params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(from_str) = current else {
          return Ok(Err(CoreError::ChoiceNotFound(id).into()));
        };

        if let (Some(to_id), Some(to_str)) = (to_page_id, to_str.as_deref()) {
          let from_id = match decode_uuid(&from_str) {
            Ok(from_id) => from_id,
            Err(e) => return Ok(Err(e)),
          };
          let from = select_page(&tx, &from_str)?;
          let to = select_page(&tx, to_str)?;
          if let Err(e) = check_edge(from_id, from, to_id, to) {
            return Ok(Err(e));
          }
        }

        tx.execute(
          "UPDATE choices SET
             choice_text  = COALESCE(?2, choice_text),
             to_page_id   = COALESCE(?3, to_page_id),
             choice_order = COALESCE(?4, choice_order),
             time_change  = COALESCE(?5, time_change)
           WHERE choice_id = ?1",
          params![id_str, text, to_str, order, time_change],
        )?;
        let raw = tx
          .query_row(
            &format!("{CHOICE_SELECT} WHERE c.choice_id = ?1"),
            params![id_str],
            RawChoice::from_row,
          )
          .optional()?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    outcome?
      .ok_or(Error::Core(CoreError::ChoiceNotFound(id)))?
      .into_choice()
  }

  async fn delete_choice(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM choices WHERE choice_id = ?1", params![id_str])?)
      })
      .await?;

    if deleted == 0 {
      return Err(CoreError::ChoiceNotFound(id).into());
    }
    Ok(())
  }

  // ── Sessions ──────────────────────────────────────────────────────────

  async fn create_session(&self, input: NewSession) -> Result<PlaySession> {
    let session_id = Uuid::new_v4();
    let id_str = encode_uuid(session_id);
    let story_str = encode_uuid(input.story_id);
    let page_str = encode_uuid(input.current_page_id);
    let reader = non_blank(input.reader);
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions
             (session_id, story_id, current_page_id, reader, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          params![id_str, story_str, page_str, reader, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.fetch_session(session_id).await
  }

  async fn get_session(&self, id: Uuid) -> Result<Option<PlaySession>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("{SESSION_SELECT} WHERE se.session_id = ?1"),
            params![id_str],
            RawSession::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawSession::into_session).transpose()
  }

  async fn set_session_page(&self, session_id: Uuid, page_id: Uuid) -> Result<PlaySession> {
    let id_str = encode_uuid(session_id);
    let page_str = encode_uuid(page_id);
    let at_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE sessions SET current_page_id = ?2, updated_at = ?3 WHERE session_id = ?1",
          params![id_str, page_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(CoreError::SessionNotFound(session_id).into());
    }
    self.fetch_session(session_id).await
  }

  // ── Completions ───────────────────────────────────────────────────────

  async fn record_completion(
    &self,
    story_id: Uuid,
    ending_page_id: Uuid,
    reader: Option<String>,
  ) -> Result<bool> {
    let id_str = encode_uuid(Uuid::new_v4());
    let story_str = encode_uuid(story_id);
    let page_str = encode_uuid(ending_page_id);
    let reader = non_blank(reader);
    let at_str = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO completions
             (completion_id, story_id, ending_page_id, reader, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![id_str, story_str, page_str, reader, at_str],
        )?)
      })
      .await?;

    Ok(inserted == 1)
  }

  async fn list_completions(&self, story_id: Uuid) -> Result<Vec<Completion>> {
    let id_str = encode_uuid(story_id);
    let raws: Vec<RawCompletion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT completion_id, story_id, ending_page_id, reader, recorded_at
             FROM completions
            WHERE story_id = ?1
            ORDER BY recorded_at, rowid",
        )?;
        let rows = stmt
          .query_map(params![id_str], RawCompletion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCompletion::into_completion).collect()
  }
}
