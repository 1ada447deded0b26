//! Application state machine and event dispatcher.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use storyline_core::{story::Story, view::SessionView};
use uuid::Uuid;

use crate::client::ApiClient;

// ─── Screen ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
  /// Browsing published stories.
  StoryList,
  /// Playing a story; the right pane shows the current page.
  Reading,
}

// ─── App ─────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  pub screen: Screen,

  /// Published stories returned by the API on startup.
  pub stories: Vec<Story>,

  /// Current fuzzy-filter string (only active when `filter_active`).
  pub filter: String,

  pub filter_active: bool,

  /// Cursor position within the *filtered* story list.
  pub list_cursor: usize,

  /// The session being played, with its current page.
  pub session: Option<SessionView>,

  /// Highlighted choice on the current page.
  pub choice_cursor: usize,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  pub client: Arc<ApiClient>,
}

impl App {
  pub fn new(client: ApiClient) -> Self {
    Self {
      screen: Screen::StoryList,
      stories: Vec::new(),
      filter: String::new(),
      filter_active: false,
      list_cursor: 0,
      session: None,
      choice_cursor: 0,
      status_msg: String::new(),
      client: Arc::new(client),
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────

  pub async fn load_stories(&mut self) -> anyhow::Result<()> {
    self.status_msg = "Loading stories…".into();
    match self.client.list_stories().await {
      Ok(stories) => {
        self.stories = stories;
        self.list_cursor = 0;
        self.status_msg = String::new();
        Ok(())
      }
      Err(e) => {
        self.status_msg = format!("Error: {e}");
        Err(e)
      }
    }
  }

  /// Replace the current session view, or report the failure in the status
  /// bar and keep the old one.
  fn show(&mut self, result: anyhow::Result<SessionView>) {
    match result {
      Ok(view) => {
        self.status_msg = if view.session.state.is_complete() {
          match &view.page.ending_label {
            Some(label) => format!("The end: {label}"),
            None => "The end".to_string(),
          }
        } else {
          String::new()
        };
        self.session = Some(view);
        self.choice_cursor = 0;
        self.screen = Screen::Reading;
      }
      Err(e) => {
        tracing::warn!(error = %e, "request failed");
        self.status_msg = format!("Error: {e}");
      }
    }
  }

  // ── Filtered list ─────────────────────────────────────────────────────

  /// Stories matching the current filter over title, author and tags.
  pub fn filtered_stories(&self) -> Vec<&Story> {
    if self.filter.is_empty() {
      return self.stories.iter().collect();
    }
    let matcher = SkimMatcherV2::default();
    self
      .stories
      .iter()
      .filter(|s| {
        let haystack = format!(
          "{} {} {}",
          s.title,
          s.author.as_deref().unwrap_or_default(),
          s.tags.join(" ")
        );
        matcher.fuzzy_match(&haystack, &self.filter).is_some()
      })
      .collect()
  }

  pub fn cursor_story(&self) -> Option<&Story> {
    self.filtered_stories().get(self.list_cursor).copied()
  }

  fn choice_count(&self) -> usize {
    self.session.as_ref().map_or(0, |s| s.page.choices.len())
  }

  // ── Key handling ──────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    if self.filter_active {
      self.handle_filter_key(key);
      return Ok(true);
    }

    match self.screen {
      Screen::StoryList => self.handle_list_key(key).await,
      Screen::Reading => self.handle_reading_key(key).await,
    }
  }

  fn handle_filter_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.filter_active = false;
        self.filter.clear();
      }
      KeyCode::Enter => self.filter_active = false,
      KeyCode::Backspace => {
        self.filter.pop();
      }
      KeyCode::Char(c) => self.filter.push(c),
      _ => {}
    }
    self.list_cursor = 0;
  }

  async fn handle_list_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Char('q') => return Ok(false),

      KeyCode::Down | KeyCode::Char('j') => {
        if self.list_cursor + 1 < self.filtered_stories().len() {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.list_cursor = self.list_cursor.saturating_sub(1);
      }

      KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
        if let Some(id) = self.cursor_story().map(|s| s.story_id) {
          self.start(id).await;
        }
      }

      KeyCode::Char('/') => {
        self.filter_active = true;
        self.filter.clear();
        self.list_cursor = 0;
      }

      KeyCode::Char('g') => {
        self.load_stories().await.ok();
      }

      _ => {}
    }
    Ok(true)
  }

  async fn handle_reading_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Char('q') => return Ok(false),

      KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
        self.screen = Screen::StoryList;
        self.session = None;
        self.status_msg.clear();
      }

      KeyCode::Down | KeyCode::Char('j') => {
        if self.choice_cursor + 1 < self.choice_count() {
          self.choice_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.choice_cursor = self.choice_cursor.saturating_sub(1);
      }

      KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
        self.choose(self.choice_cursor).await;
      }
      KeyCode::Char(c @ '1'..='9') => {
        let index = c as usize - '1' as usize;
        if index < self.choice_count() {
          self.choose(index).await;
        }
      }

      KeyCode::Char('r') => {
        if let Some(story_id) = self.session.as_ref().map(|s| s.session.story_id) {
          let result = self.client.restart(story_id).await;
          self.show(result);
        }
      }

      _ => {}
    }
    Ok(true)
  }

  async fn start(&mut self, story_id: Uuid) {
    let result = self.client.start(story_id).await;
    self.show(result);
  }

  /// Follow the choice at `index` on the current page.
  async fn choose(&mut self, index: usize) {
    let Some(view) = &self.session else { return };
    let Some(choice) = view.page.choices.get(index) else { return };
    let (session_id, choice_id) = (view.session.session_id, choice.choice_id);
    let result = self.client.choose(session_id, choice_id).await;
    self.show(result);
  }
}
