//! Story documents: whole stories authored as TOML and loaded in one go.
//!
//! Pages are addressed by key inside a document; choices name their target
//! page by key and are resolved to page ids during import.
//!
//! ```toml
//! title = "Exam Day"
//! status = "published"
//!
//! [[pages]]
//! key = "start"
//! content = "It is 23:47."
//! start = true
//!
//! [[pages.choices]]
//! to = "sleep"
//! text = "Go to sleep now"
//! ```

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  store::StoryStore,
  story::{NewChoice, NewPage, NewStory, Story, StoryStatus},
};

/// A complete story as written by an author.
#[derive(Debug, Clone, Deserialize)]
pub struct StoryDocument {
  pub title:       String,
  pub description: Option<String>,
  pub author:      Option<String>,
  #[serde(default)]
  pub status:      StoryStatus,
  #[serde(default)]
  pub tags:        Vec<String>,
  #[serde(default)]
  pub pages:       Vec<PageDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageDocument {
  pub key:          String,
  pub content:      String,
  #[serde(default)]
  pub start:        bool,
  #[serde(default)]
  pub ending:       bool,
  pub ending_label: Option<String>,
  #[serde(default)]
  pub choices:      Vec<ChoiceDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceDocument {
  /// Key of the target page.
  pub to:          String,
  pub text:        String,
  /// Defaults to the choice's 1-based position on its page.
  pub order:       Option<i32>,
  #[serde(default)]
  pub time_change: i32,
}

impl StoryDocument {
  pub fn from_toml(raw: &str) -> Result<Self> { Ok(toml::from_str(raw)?) }

  /// Reject documents that cannot be imported as a consistent graph.
  pub fn check(&self) -> Result<()> {
    NewStory::new(self.title.clone()).validate()?;

    let mut keys = HashSet::new();
    for page in &self.pages {
      if !keys.insert(page.key.as_str()) {
        return Err(Error::DuplicatePageKey(page.key.clone()));
      }
    }

    let starts = self.pages.iter().filter(|p| p.start).count();
    if starts > 1 {
      return Err(Error::Validation(format!(
        "{starts} pages are marked as start; at most one is allowed"
      )));
    }

    for page in &self.pages {
      for choice in &page.choices {
        if !keys.contains(choice.to.as_str()) {
          return Err(Error::Validation(format!(
            "choice {:?} on page {:?} targets unknown page {:?}",
            choice.text, page.key, choice.to
          )));
        }
      }
    }
    Ok(())
  }
}

/// Persist `doc` as a new story and return it with its start page set.
///
/// Pages are created first, then every choice. A failure part-way leaves the
/// partially imported story behind for the caller to delete.
pub async fn import_story<S: StoryStore>(store: &S, doc: StoryDocument) -> Result<Story> {
  doc.check()?;

  let story = store
    .create_story(NewStory {
      title:       doc.title,
      description: doc.description,
      author:      doc.author,
      status:      doc.status,
      tags:        doc.tags,
    })
    .await
    .map_err(Error::from_store)?;

  let mut page_ids: HashMap<String, Uuid> = HashMap::new();
  for page in &doc.pages {
    let created = store
      .create_page(NewPage {
        story_id:     story.story_id,
        key:          Some(page.key.clone()),
        content:      page.content.clone(),
        is_start:     page.start,
        is_ending:    page.ending,
        ending_label: page.ending_label.clone(),
      })
      .await
      .map_err(Error::from_store)?;
    page_ids.insert(page.key.clone(), created.page_id);
  }

  for page in &doc.pages {
    let from_page_id = page_ids[&page.key];
    for (position, choice) in page.choices.iter().enumerate() {
      let order = match choice.order {
        Some(order) => order,
        None => i32::try_from(position + 1)
          .map_err(|_| Error::Validation("too many choices on one page".into()))?,
      };
      store
        .create_choice(NewChoice {
          from_page_id,
          to_page_id: page_ids[&choice.to],
          text: choice.text.clone(),
          order,
          time_change: choice.time_change,
        })
        .await
        .map_err(Error::from_store)?;
    }
  }

  tracing::info!(
    story_id = %story.story_id,
    pages = doc.pages.len(),
    "story imported"
  );

  store
    .get_story(story.story_id)
    .await
    .map_err(Error::from_store)?
    .ok_or(Error::StoryNotFound(story.story_id))
}
