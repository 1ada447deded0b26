//! The story graph: pages are nodes, choices are directed edges.
//!
//! Graph-shaped queries go through [`StoryGraph`], which reads current state
//! from a [`StoryStore`] on every call. [`validate`] is a pure integrity lint
//! over a [`StorySnapshot`] for authors.
//!
//! The graph is not assumed to be acyclic. Termination is decided solely by
//! a page's `is_ending` flag.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  store::StoryStore,
  story::{Choice, Page, Story},
};

// ─── Pure graph rules ────────────────────────────────────────────────────────

/// `true` if both pages belong to the same story. Guards every choice write.
pub fn validate_same_story(a: &Page, b: &Page) -> bool { a.story_id == b.story_id }

/// A page is terminal if and only if it is flagged as an ending, regardless
/// of any outgoing choices still in storage.
pub fn is_ending(page: &Page) -> bool { page.is_ending }

/// Sort choices ascending by `order`. The sort is stable, so choices with
/// equal order keep the relative order the store returned them in.
pub fn order_choices(choices: &mut [Choice]) { choices.sort_by_key(|c| c.order); }

// ─── Store-backed queries ────────────────────────────────────────────────────

/// Read-side view of the graph over a store.
pub struct StoryGraph<'a, S> {
  store: &'a S,
}

impl<'a, S: StoryStore> StoryGraph<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  /// The page a new session starts on.
  ///
  /// Fails with [`Error::NoStartPage`] when the story has no start pointer.
  pub async fn get_start_page(&self, story: &Story) -> Result<Page> {
    let page_id = story
      .start_page_id
      .ok_or(Error::NoStartPage(story.story_id))?;

    let page = self
      .store
      .get_page(page_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::NoStartPage(story.story_id))?;

    if page.story_id != story.story_id {
      return Err(Error::ForeignPage { story_id: story.story_id, page_id });
    }
    Ok(page)
  }

  /// Outgoing choices of `page_id` in presentation order.
  pub async fn get_choices(&self, page_id: Uuid) -> Result<Vec<Choice>> {
    let mut choices = self
      .store
      .list_choices(page_id)
      .await
      .map_err(Error::from_store)?;
    order_choices(&mut choices);
    Ok(choices)
  }

  /// Load a story with all of its pages and choices.
  pub async fn snapshot(&self, story_id: Uuid) -> Result<StorySnapshot> {
    let story = self
      .store
      .get_story(story_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::StoryNotFound(story_id))?;
    let pages = self
      .store
      .list_pages(story_id)
      .await
      .map_err(Error::from_store)?;
    let choices = self
      .store
      .list_story_choices(story_id)
      .await
      .map_err(Error::from_store)?;

    Ok(StorySnapshot { story, pages, choices })
  }
}

// ─── Integrity lint ──────────────────────────────────────────────────────────

/// A story together with every page and choice it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorySnapshot {
  pub story:   Story,
  pub pages:   Vec<Page>,
  pub choices: Vec<Choice>,
}

/// A structural problem found by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphIssue {
  MissingStartPage,
  /// The start pointer names a page that is not part of the story.
  ForeignStartPage { page_id: Uuid },
  /// The choice targets a page that is not part of the story.
  DanglingChoice { choice_id: Uuid, to_page_id: Uuid },
  UnreachablePage { page_id: Uuid, key: String },
  /// A non-ending page with no way forward.
  DeadEnd { page_id: Uuid, key: String },
  NoReachableEnding,
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphReport {
  pub story_id: Uuid,
  pub issues:   Vec<GraphIssue>,
}

impl GraphReport {
  /// Whether a reader can start the story and reach at least one ending.
  pub fn is_playable(&self) -> bool {
    !self.issues.iter().any(|i| {
      matches!(
        i,
        GraphIssue::MissingStartPage
          | GraphIssue::ForeignStartPage { .. }
          | GraphIssue::NoReachableEnding
      )
    })
  }

  pub fn is_clean(&self) -> bool { self.issues.is_empty() }
}

/// Check a story's graph for structural problems.
///
/// Reachability is a breadth-first walk from the start page. Already visited
/// pages are skipped, so cycles are fine. Choices out of ending pages are not
/// followed, since traversal never presents them.
pub fn validate(snapshot: &StorySnapshot) -> GraphReport {
  let story_id = snapshot.story.story_id;
  let pages: HashMap<Uuid, &Page> = snapshot
    .pages
    .iter()
    .filter(|p| p.story_id == story_id)
    .map(|p| (p.page_id, p))
    .collect();

  let mut issues = Vec::new();

  let start = match snapshot.story.start_page_id {
    None => {
      issues.push(GraphIssue::MissingStartPage);
      None
    }
    Some(id) if !pages.contains_key(&id) => {
      issues.push(GraphIssue::ForeignStartPage { page_id: id });
      None
    }
    Some(id) => Some(id),
  };

  let mut edges: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
  for choice in &snapshot.choices {
    if !pages.contains_key(&choice.from_page_id) {
      continue;
    }
    if !pages.contains_key(&choice.to_page_id) {
      issues.push(GraphIssue::DanglingChoice {
        choice_id:  choice.choice_id,
        to_page_id: choice.to_page_id,
      });
      continue;
    }
    edges
      .entry(choice.from_page_id)
      .or_default()
      .push(choice.to_page_id);
  }

  let reachable = start.map(|s| reachable_from(s, &pages, &edges));

  if let Some(reached) = &reachable {
    for page in snapshot.pages.iter().filter(|p| p.story_id == story_id) {
      if !reached.contains(&page.page_id) {
        issues.push(GraphIssue::UnreachablePage {
          page_id: page.page_id,
          key:     page.key.clone(),
        });
      }
    }
  }

  for page in snapshot.pages.iter().filter(|p| p.story_id == story_id) {
    let has_exit = edges.get(&page.page_id).is_some_and(|e| !e.is_empty());
    if !page.is_ending && !has_exit {
      issues.push(GraphIssue::DeadEnd {
        page_id: page.page_id,
        key:     page.key.clone(),
      });
    }
  }

  if let Some(reached) = &reachable {
    let ending_reached = reached
      .iter()
      .filter_map(|id| pages.get(id))
      .any(|p| is_ending(p));
    if !ending_reached {
      issues.push(GraphIssue::NoReachableEnding);
    }
  }

  GraphReport { story_id, issues }
}

fn reachable_from(
  start: Uuid,
  pages: &HashMap<Uuid, &Page>,
  edges: &HashMap<Uuid, Vec<Uuid>>,
) -> HashSet<Uuid> {
  let mut seen = HashSet::from([start]);
  let mut queue = VecDeque::from([start]);

  while let Some(id) = queue.pop_front() {
    if pages.get(&id).is_some_and(|p| is_ending(p)) {
      continue;
    }
    for next in edges.get(&id).into_iter().flatten() {
      if seen.insert(*next) {
        queue.push_back(*next);
      }
    }
  }
  seen
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::story::StoryStatus;

  fn story(start: Option<Uuid>) -> Story {
    Story {
      story_id:      Uuid::nil(),
      title:         "Test".into(),
      description:   None,
      author:        None,
      status:        StoryStatus::Draft,
      tags:          vec![],
      start_page_id: start,
      created_at:    Utc::now(),
      updated_at:    Utc::now(),
    }
  }

  fn page(key: &str, is_ending: bool) -> Page {
    Page {
      page_id: Uuid::new_v4(),
      story_id: Uuid::nil(),
      key: key.into(),
      content: format!("{key} content"),
      is_start: false,
      is_ending,
      ending_label: None,
      created_at: Utc::now(),
    }
  }

  fn choice(from: &Page, to: Uuid, order: i32) -> Choice {
    Choice {
      choice_id: Uuid::new_v4(),
      from_page_id: from.page_id,
      to_page_id: to,
      text: "go".into(),
      order,
      time_change: 0,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn same_story_check_compares_owning_story() {
    let a = page("a", false);
    let mut b = page("b", false);
    assert!(validate_same_story(&a, &b));
    b.story_id = Uuid::new_v4();
    assert!(!validate_same_story(&a, &b));
  }

  #[test]
  fn ordering_is_ascending_and_stable() {
    let from = page("from", false);
    let first = choice(&from, Uuid::nil(), 2);
    let second = choice(&from, Uuid::nil(), 1);
    let third = choice(&from, Uuid::nil(), 2);
    let mut choices = vec![first.clone(), second.clone(), third.clone()];

    order_choices(&mut choices);

    let ids: Vec<_> = choices.iter().map(|c| c.choice_id).collect();
    assert_eq!(ids, [second.choice_id, first.choice_id, third.choice_id]);
  }

  #[test]
  fn missing_start_page_is_not_playable() {
    let end = page("end", true);
    let snapshot = StorySnapshot { story: story(None), pages: vec![end], choices: vec![] };
    let report = validate(&snapshot);
    assert_eq!(report.issues, [GraphIssue::MissingStartPage]);
    assert!(!report.is_playable());
  }

  #[test]
  fn cyclic_graph_with_reachable_ending_is_clean() {
    let start = page("start", false);
    let hall = page("hall", false);
    let end = page("end", true);
    let choices = vec![
      choice(&start, hall.page_id, 1),
      choice(&hall, start.page_id, 1),
      choice(&hall, end.page_id, 2),
    ];
    let snapshot = StorySnapshot {
      story: story(Some(start.page_id)),
      pages: vec![start, hall, end],
      choices,
    };

    let report = validate(&snapshot);
    assert!(report.is_clean(), "{:?}", report.issues);
    assert!(report.is_playable());
  }

  #[test]
  fn loop_without_ending_is_reported() {
    let start = page("start", false);
    let hall = page("hall", false);
    let end = page("end", true);
    let choices = vec![choice(&start, hall.page_id, 1), choice(&hall, start.page_id, 1)];
    let end_id = end.page_id;
    let snapshot = StorySnapshot {
      story: story(Some(start.page_id)),
      pages: vec![start, hall, end],
      choices,
    };

    let report = validate(&snapshot);
    assert!(report.issues.contains(&GraphIssue::UnreachablePage {
      page_id: end_id,
      key:     "end".into(),
    }));
    assert!(report.issues.contains(&GraphIssue::NoReachableEnding));
    assert!(!report.is_playable());
  }

  #[test]
  fn choices_out_of_endings_are_not_followed() {
    let start = page("start", false);
    let end = page("end", true);
    let secret = page("secret", true);
    let choices = vec![choice(&start, end.page_id, 1), choice(&end, secret.page_id, 1)];
    let secret_id = secret.page_id;
    let snapshot = StorySnapshot {
      story: story(Some(start.page_id)),
      pages: vec![start, end, secret],
      choices,
    };

    let report = validate(&snapshot);
    assert_eq!(report.issues, [GraphIssue::UnreachablePage {
      page_id: secret_id,
      key:     "secret".into(),
    }]);
  }

  #[test]
  fn dangling_choices_and_dead_ends_are_reported() {
    let start = page("start", false);
    let stuck = page("stuck", false);
    let elsewhere = Uuid::new_v4();
    let dangling = choice(&start, elsewhere, 2);
    let choices = vec![choice(&start, stuck.page_id, 1), dangling.clone()];
    let stuck_id = stuck.page_id;
    let snapshot = StorySnapshot {
      story: story(Some(start.page_id)),
      pages: vec![start, stuck],
      choices,
    };

    let report = validate(&snapshot);
    assert!(report.issues.contains(&GraphIssue::DanglingChoice {
      choice_id:  dangling.choice_id,
      to_page_id: elsewhere,
    }));
    assert!(report.issues.contains(&GraphIssue::DeadEnd {
      page_id: stuck_id,
      key:     "stuck".into(),
    }));
    assert!(report.issues.contains(&GraphIssue::NoReachableEnding));
  }

  #[test]
  fn foreign_start_pointer_is_reported() {
    let stray = Uuid::new_v4();
    let end = page("end", true);
    let snapshot = StorySnapshot { story: story(Some(stray)), pages: vec![end], choices: vec![] };
    let report = validate(&snapshot);
    assert_eq!(report.issues, [GraphIssue::ForeignStartPage { page_id: stray }]);
  }
}
