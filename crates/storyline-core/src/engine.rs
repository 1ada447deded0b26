//! The play-session state machine.
//!
//! A session is `Active` while its current page is not an ending and
//! `Complete` once it is. Each operation is a short read-validate-write
//! against the store; concurrent advances on one session are not
//! coordinated and the last writer wins.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error, Result,
  graph::{StoryGraph, is_ending},
  session::{NewSession, PlaySession},
  store::StoryStore,
  story::{Page, Story},
  view::{PageView, SessionView},
};

/// Drives reader sessions through a story graph.
///
/// Construct once and share; cloning is cheap because the store is held in
/// an [`Arc`].
pub struct PlayEngine<S> {
  store: Arc<S>,
}

impl<S> Clone for PlayEngine<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: StoryStore> PlayEngine<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  pub fn graph(&self) -> StoryGraph<'_, S> { StoryGraph::new(self.store.as_ref()) }

  // ── Transitions ───────────────────────────────────────────────────────

  /// Open a new session on the story's start page.
  ///
  /// Fails with [`Error::InvalidStory`] if no start page is designated.
  pub async fn start(&self, story_id: Uuid, reader: Option<String>) -> Result<PlaySession> {
    let story = self.story(story_id).await?;

    let start = match self.graph().get_start_page(&story).await {
      Ok(page) => page,
      Err(Error::NoStartPage(_) | Error::ForeignPage { .. }) => {
        tracing::warn!(%story_id, "refusing to start story without a start page");
        return Err(Error::InvalidStory(story_id));
      }
      Err(e) => return Err(e),
    };

    let session = self
      .store
      .create_session(NewSession {
        story_id,
        current_page_id: start.page_id,
        reader,
      })
      .await
      .map_err(Error::from_store)?;

    tracing::info!(
      session_id = %session.session_id,
      %story_id,
      page_id = %start.page_id,
      "session started"
    );

    if is_ending(&start) {
      self.complete(&session, &start).await?;
    }
    Ok(session)
  }

  /// Follow `choice_id` from the session's current page.
  ///
  /// The choice must be one of the choices offered on the page the session
  /// is on; anything else fails with [`Error::InvalidChoice`] and leaves the
  /// session untouched. Ending pages offer no choices.
  pub async fn advance(&self, session_id: Uuid, choice_id: Uuid) -> Result<PlaySession> {
    let session = self.session(session_id).await?;
    let page = self.current_page(&session).await?;

    let offered = if is_ending(&page) {
      Vec::new()
    } else {
      self.graph().get_choices(page.page_id).await?
    };

    let Some(choice) = offered.into_iter().find(|c| c.choice_id == choice_id) else {
      tracing::warn!(
        %session_id,
        page_id = %page.page_id,
        %choice_id,
        "choice rejected"
      );
      return Err(Error::InvalidChoice { page_id: page.page_id, choice_id });
    };

    let target = self.page(choice.to_page_id).await?;
    let session = self
      .store
      .set_session_page(session_id, target.page_id)
      .await
      .map_err(Error::from_store)?;

    tracing::info!(
      %session_id,
      from_page = %page.page_id,
      to_page = %target.page_id,
      "session advanced"
    );

    if is_ending(&target) {
      self.complete(&session, &target).await?;
    }
    Ok(session)
  }

  /// Start over with a fresh session. The previous session and any
  /// completion it recorded are left as they are.
  pub async fn restart(&self, story_id: Uuid, reader: Option<String>) -> Result<PlaySession> {
    tracing::debug!(%story_id, "restarting story");
    self.start(story_id, reader).await
  }

  async fn complete(&self, session: &PlaySession, ending: &Page) -> Result<bool> {
    let recorded = self
      .store
      .record_completion(session.story_id, ending.page_id, session.reader.clone())
      .await
      .map_err(Error::from_store)?;

    if recorded {
      tracing::info!(
        session_id = %session.session_id,
        story_id = %session.story_id,
        ending_page = %ending.page_id,
        "completion recorded"
      );
    } else {
      tracing::debug!(
        session_id = %session.session_id,
        ending_page = %ending.page_id,
        "completion already recorded"
      );
    }
    Ok(recorded)
  }

  // ── Projections ───────────────────────────────────────────────────────

  /// The session's current page with its choices.
  pub async fn session_view(&self, session_id: Uuid) -> Result<SessionView> {
    let session = self.session(session_id).await?;
    let story = self.story(session.story_id).await?;
    let page = self.current_page(&session).await?;
    let page = self.project(page).await?;

    Ok(SessionView { session, story_title: story.title, page })
  }

  pub async fn page_view(&self, page_id: Uuid) -> Result<PageView> {
    let page = self.page(page_id).await?;
    self.project(page).await
  }

  async fn project(&self, page: Page) -> Result<PageView> {
    let choices = if is_ending(&page) {
      Vec::new()
    } else {
      self.graph().get_choices(page.page_id).await?
    };
    Ok(PageView::project(page, choices))
  }

  /// The view of the story's start page.
  pub async fn start_view(&self, story_id: Uuid) -> Result<PageView> {
    let story = self.story(story_id).await?;
    let start = self.graph().get_start_page(&story).await?;
    self.page_view(start.page_id).await
  }

  // ── Lookups ───────────────────────────────────────────────────────────

  async fn story(&self, id: Uuid) -> Result<Story> {
    self
      .store
      .get_story(id)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::StoryNotFound(id))
  }

  async fn page(&self, id: Uuid) -> Result<Page> {
    self
      .store
      .get_page(id)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::PageNotFound(id))
  }

  /// The page a session stands on, or [`Error::SessionStranded`] if it was
  /// deleted from under it.
  async fn current_page(&self, session: &PlaySession) -> Result<Page> {
    let Some(page_id) = session.current_page_id else {
      tracing::warn!(session_id = %session.session_id, "session page was deleted");
      return Err(Error::SessionStranded(session.session_id));
    };
    // A page deleted between the two reads strands the session the same way.
    match self.page(page_id).await {
      Err(Error::PageNotFound(_)) => Err(Error::SessionStranded(session.session_id)),
      other => other,
    }
  }

  async fn session(&self, id: Uuid) -> Result<PlaySession> {
    self
      .store
      .get_session(id)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::SessionNotFound(id))
  }
}
