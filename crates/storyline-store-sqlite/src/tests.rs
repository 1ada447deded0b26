//! Integration tests for `SqliteStore` against an in-memory database, plus
//! the play engine driven on top of it.

use std::sync::Arc;

use storyline_core::{
  Error as CoreError, PlayEngine,
  graph::{self, GraphIssue},
  import::{StoryDocument, import_story},
  session::SessionState,
  store::{StoryQuery, StoryStore},
  story::{
    ChoicePatch, NewChoice, NewPage, NewStory, PagePatch, Story, StoryPatch, StoryStatus,
  },
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

const EXAM_DAY: &str = include_str!("../../../demos/exam_day.toml");

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn story(s: &SqliteStore, title: &str) -> Story {
  s.create_story(NewStory::new(title)).await.unwrap()
}

fn core(e: Error) -> CoreError { e.into() }

/// start -> middle -> (good | bad), with both endings labelled.
struct Fixture {
  story:   Uuid,
  start:   Uuid,
  middle:  Uuid,
  good:    Uuid,
  bad:     Uuid,
  to_mid:  Uuid,
  to_good: Uuid,
  to_bad:  Uuid,
}

async fn fixture(s: &SqliteStore) -> Fixture {
  let st = story(s, "Fixture").await;
  let start = s
    .create_page(NewPage::new(st.story_id, "start", "You wake up.").start())
    .await
    .unwrap();
  let middle = s
    .create_page(NewPage::new(st.story_id, "middle", "A fork in the road."))
    .await
    .unwrap();
  let good = s
    .create_page(NewPage::new(st.story_id, "good", "Home.").ending(Some("good")))
    .await
    .unwrap();
  let bad = s
    .create_page(NewPage::new(st.story_id, "bad", "Lost.").ending(Some("bad")))
    .await
    .unwrap();

  let to_mid = s
    .create_choice(NewChoice::new(start.page_id, middle.page_id, "Walk", 1))
    .await
    .unwrap();
  let to_good = s
    .create_choice(NewChoice::new(middle.page_id, good.page_id, "Left", 1))
    .await
    .unwrap();
  let to_bad = s
    .create_choice(NewChoice::new(middle.page_id, bad.page_id, "Right", 2))
    .await
    .unwrap();

  Fixture {
    story: st.story_id,
    start: start.page_id,
    middle: middle.page_id,
    good: good.page_id,
    bad: bad.page_id,
    to_mid: to_mid.choice_id,
    to_good: to_good.choice_id,
    to_bad: to_bad.choice_id,
  }
}

// ─── Stories ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_story() {
  let s = store().await;

  let created = s
    .create_story(NewStory {
      title:       "  Exam Day ".into(),
      description: Some("".into()),
      author:      Some("system".into()),
      status:      StoryStatus::Published,
      tags:        vec!["exam".into(), "paris".into()],
    })
    .await
    .unwrap();
  assert_eq!(created.title, "Exam Day");
  assert_eq!(created.description, None);
  assert_eq!(created.start_page_id, None);

  let fetched = s.get_story(created.story_id).await.unwrap().unwrap();
  assert_eq!(fetched.title, "Exam Day");
  assert_eq!(fetched.author.as_deref(), Some("system"));
  assert_eq!(fetched.status, StoryStatus::Published);
  assert_eq!(fetched.tags, ["exam", "paris"]);
}

#[tokio::test]
async fn blank_title_is_rejected() {
  let s = store().await;
  let err = s.create_story(NewStory::new("   ")).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Validation(_))));
}

#[tokio::test]
async fn get_story_missing_returns_none() {
  let s = store().await;
  assert!(s.get_story(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_stories_filters() {
  let s = store().await;
  let draft = story(&s, "Night Train").await;
  let published = s
    .create_story(NewStory {
      title: "Metro Madness".into(),
      description: Some("A race across Paris".into()),
      status: StoryStatus::Published,
      tags: vec!["paris".into()],
      ..NewStory::default()
    })
    .await
    .unwrap();

  let all = s.list_stories(&StoryQuery::default()).await.unwrap();
  assert_eq!(all.len(), 2);
  // Newest first.
  assert_eq!(all[0].story_id, published.story_id);

  let q = StoryQuery { status: Some(StoryStatus::Draft), ..Default::default() };
  let drafts = s.list_stories(&q).await.unwrap();
  assert_eq!(drafts.len(), 1);
  assert_eq!(drafts[0].story_id, draft.story_id);

  let q = StoryQuery { text: Some("paris".into()), ..Default::default() };
  let found = s.list_stories(&q).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].story_id, published.story_id);

  let q = StoryQuery { tag: Some("paris".into()), ..Default::default() };
  assert_eq!(s.list_stories(&q).await.unwrap().len(), 1);

  let q = StoryQuery { limit: Some(1), offset: Some(1), ..Default::default() };
  let page = s.list_stories(&q).await.unwrap();
  assert_eq!(page.len(), 1);
  assert_eq!(page[0].story_id, draft.story_id);
}

#[tokio::test]
async fn text_filter_matches_wildcards_literally() {
  let s = store().await;
  story(&s, "Exam Day").await;
  let odd = story(&s, "100% awake_at_night").await;

  for text in ["%", "_", "\\"] {
    let q = StoryQuery { text: Some(text.into()), ..Default::default() };
    let hits = s.list_stories(&q).await.unwrap();
    let expected = usize::from(text != "\\");
    assert_eq!(hits.len(), expected, "filter {text:?}");
  }

  let q = StoryQuery { text: Some("0% a".into()), ..Default::default() };
  let hits = s.list_stories(&q).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].story_id, odd.story_id);
}

#[tokio::test]
async fn huge_limit_and_offset_do_not_wrap() {
  let s = store().await;
  story(&s, "Exam Day").await;

  let q = StoryQuery { limit: Some(usize::MAX), ..Default::default() };
  assert_eq!(s.list_stories(&q).await.unwrap().len(), 1);

  let q = StoryQuery { offset: Some(usize::MAX), ..Default::default() };
  assert!(s.list_stories(&q).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_story_patches_fields() {
  let s = store().await;
  let st = s
    .create_story(NewStory {
      title: "Draft".into(),
      description: Some("Old".into()),
      ..NewStory::default()
    })
    .await
    .unwrap();

  let updated = s
    .update_story(st.story_id, StoryPatch {
      title: Some("Final".into()),
      status: Some(StoryStatus::Published),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.title, "Final");
  assert_eq!(updated.status, StoryStatus::Published);
  assert_eq!(updated.description.as_deref(), Some("Old"));

  let cleared = s
    .update_story(st.story_id, StoryPatch {
      description: Some(String::new()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(cleared.description, None);
}

#[tokio::test]
async fn update_missing_story_is_not_found() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s.update_story(id, StoryPatch::default()).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::StoryNotFound(x)) if x == id));
}

#[tokio::test]
async fn delete_story_cascades() {
  let s = store().await;
  let f = fixture(&s).await;
  let engine = PlayEngine::new(Arc::new(s.clone()));
  let session = engine.start(f.story, None).await.unwrap();

  s.delete_story(f.story).await.unwrap();

  assert!(s.get_story(f.story).await.unwrap().is_none());
  assert!(s.get_page(f.start).await.unwrap().is_none());
  assert!(s.get_choice(f.to_mid).await.unwrap().is_none());
  assert!(s.get_session(session.session_id).await.unwrap().is_none());

  let err = s.delete_story(f.story).await.unwrap_err();
  assert!(matches!(core(err), CoreError::StoryNotFound(_)));
}

// ─── Pages ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn start_flag_follows_story_pointer() {
  let s = store().await;
  let f = fixture(&s).await;

  let start = s.get_page(f.start).await.unwrap().unwrap();
  assert!(start.is_start);
  let middle = s.get_page(f.middle).await.unwrap().unwrap();
  assert!(!middle.is_start);

  let st = s.set_start_page(f.story, Some(f.middle)).await.unwrap();
  assert_eq!(st.start_page_id, Some(f.middle));
  assert!(!s.get_page(f.start).await.unwrap().unwrap().is_start);
  assert!(s.get_page(f.middle).await.unwrap().unwrap().is_start);

  let st = s.set_start_page(f.story, None).await.unwrap();
  assert_eq!(st.start_page_id, None);
}

#[tokio::test]
async fn start_page_must_belong_to_story() {
  let s = store().await;
  let f = fixture(&s).await;
  let other = story(&s, "Other").await;

  let err = s.set_start_page(other.story_id, Some(f.start)).await.unwrap_err();
  assert!(matches!(core(err), CoreError::ForeignPage { .. }));

  let unchanged = s.get_story(other.story_id).await.unwrap().unwrap();
  assert_eq!(unchanged.start_page_id, None);
}

#[tokio::test]
async fn page_key_defaults_and_is_unique() {
  let s = store().await;
  let st = story(&s, "Keys").await;

  let anonymous = s
    .create_page(NewPage { story_id: st.story_id, content: "Text".into(), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(anonymous.key, anonymous.page_id.simple().to_string());

  s.create_page(NewPage::new(st.story_id, "intro", "One")).await.unwrap();
  let err = s
    .create_page(NewPage::new(st.story_id, "intro", "Two"))
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::DuplicatePageKey(k) if k == "intro"));

  // Keys are scoped to their story.
  let other = story(&s, "Other").await;
  s.create_page(NewPage::new(other.story_id, "intro", "Three")).await.unwrap();
}

#[tokio::test]
async fn page_for_missing_story_is_rejected() {
  let s = store().await;
  let err = s
    .create_page(NewPage::new(Uuid::new_v4(), "orphan", "Nobody home"))
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::StoryNotFound(_)));
}

#[tokio::test]
async fn update_page_patches_fields() {
  let s = store().await;
  let f = fixture(&s).await;

  let page = s
    .update_page(f.middle, PagePatch {
      content: Some("A quiet crossroads.".into()),
      is_ending: Some(true),
      ending_label: Some("Stuck".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.content, "A quiet crossroads.");
  assert!(page.is_ending);
  assert_eq!(page.ending_label.as_deref(), Some("Stuck"));
  assert_eq!(page.key, "middle");

  let err = s
    .update_page(f.middle, PagePatch { key: Some("start".into()), ..Default::default() })
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::DuplicatePageKey(_)));

  // Renaming a page to its own key is not a conflict.
  s.update_page(f.middle, PagePatch { key: Some("middle".into()), ..Default::default() })
    .await
    .unwrap();
}

#[tokio::test]
async fn delete_page_removes_touching_choices() {
  let s = store().await;
  let f = fixture(&s).await;

  s.delete_page(f.middle).await.unwrap();

  assert!(s.get_choice(f.to_mid).await.unwrap().is_none());
  assert!(s.get_choice(f.to_good).await.unwrap().is_none());
  assert!(s.list_story_choices(f.story).await.unwrap().is_empty());
  assert_eq!(s.list_pages(f.story).await.unwrap().len(), 3);
}

#[tokio::test]
async fn deleting_start_page_clears_pointer() {
  let s = store().await;
  let f = fixture(&s).await;

  s.delete_page(f.start).await.unwrap();

  let st = s.get_story(f.story).await.unwrap().unwrap();
  assert_eq!(st.start_page_id, None);
}

#[tokio::test]
async fn list_pages_in_creation_order() {
  let s = store().await;
  let f = fixture(&s).await;
  let keys: Vec<_> = s
    .list_pages(f.story)
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.key)
    .collect();
  assert_eq!(keys, ["start", "middle", "good", "bad"]);
}

// ─── Choices ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cross_story_choice_is_rejected_without_writing() {
  let s = store().await;
  let f = fixture(&s).await;
  let other = story(&s, "Other").await;
  let foreign = s
    .create_page(NewPage::new(other.story_id, "elsewhere", "Far away"))
    .await
    .unwrap();

  let err = s
    .create_choice(NewChoice::new(f.start, foreign.page_id, "Teleport", 2))
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::CrossStoryEdge { .. }));

  assert_eq!(s.list_choices(f.start).await.unwrap().len(), 1);
  assert!(s.list_story_choices(other.story_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn choice_to_missing_page_is_rejected() {
  let s = store().await;
  let f = fixture(&s).await;
  let err = s
    .create_choice(NewChoice::new(f.start, Uuid::new_v4(), "Into the void", 2))
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::PageNotFound(_)));
}

#[tokio::test]
async fn choices_list_by_order_then_insertion() {
  let s = store().await;
  let st = story(&s, "Order").await;
  let a = s.create_page(NewPage::new(st.story_id, "a", "A")).await.unwrap();
  let b = s.create_page(NewPage::new(st.story_id, "b", "B")).await.unwrap();

  s.create_choice(NewChoice::new(a.page_id, b.page_id, "third", 2)).await.unwrap();
  s.create_choice(NewChoice::new(a.page_id, b.page_id, "first", 1)).await.unwrap();
  s.create_choice(NewChoice::new(a.page_id, b.page_id, "second", 1)).await.unwrap();

  let texts: Vec<_> = s
    .list_choices(a.page_id)
    .await
    .unwrap()
    .into_iter()
    .map(|c| c.text)
    .collect();
  assert_eq!(texts, ["first", "second", "third"]);
}

#[tokio::test]
async fn update_choice_retargets_within_story() {
  let s = store().await;
  let f = fixture(&s).await;

  let updated = s
    .update_choice(f.to_good, ChoicePatch {
      to_page_id: Some(f.bad),
      order: Some(5),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.to_page_id, f.bad);
  assert_eq!(updated.order, 5);
  assert_eq!(updated.text, "Left");

  let other = story(&s, "Other").await;
  let foreign = s
    .create_page(NewPage::new(other.story_id, "x", "X"))
    .await
    .unwrap();
  let err = s
    .update_choice(f.to_good, ChoicePatch {
      to_page_id: Some(foreign.page_id),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(core(err), CoreError::CrossStoryEdge { .. }));

  let kept = s.get_choice(f.to_good).await.unwrap().unwrap();
  assert_eq!(kept.to_page_id, f.bad);
}

#[tokio::test]
async fn delete_choice_then_missing() {
  let s = store().await;
  let f = fixture(&s).await;

  s.delete_choice(f.to_bad).await.unwrap();
  assert!(s.get_choice(f.to_bad).await.unwrap().is_none());

  let err = s.delete_choice(f.to_bad).await.unwrap_err();
  assert!(matches!(core(err), CoreError::ChoiceNotFound(_)));
}

// ─── Completions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn completion_is_recorded_once_per_reader() {
  let s = store().await;
  let f = fixture(&s).await;

  assert!(s.record_completion(f.story, f.good, Some("ana".into())).await.unwrap());
  assert!(!s.record_completion(f.story, f.good, Some("ana".into())).await.unwrap());
  assert!(s.record_completion(f.story, f.good, Some("ben".into())).await.unwrap());
  assert!(s.record_completion(f.story, f.bad, Some("ana".into())).await.unwrap());

  // Anonymous readers share one identity.
  assert!(s.record_completion(f.story, f.good, None).await.unwrap());
  assert!(!s.record_completion(f.story, f.good, None).await.unwrap());

  assert_eq!(s.list_completions(f.story).await.unwrap().len(), 4);
}

// ─── Engine ──────────────────────────────────────────────────────────────────

fn engine(s: &SqliteStore) -> PlayEngine<SqliteStore> { PlayEngine::new(Arc::new(s.clone())) }

#[tokio::test]
async fn start_opens_session_on_start_page() {
  let s = store().await;
  let f = fixture(&s).await;

  let session = engine(&s).start(f.story, Some("ana".into())).await.unwrap();
  assert_eq!(session.story_id, f.story);
  assert_eq!(session.current_page_id, Some(f.start));
  assert_eq!(session.state, SessionState::Active);
  assert_eq!(session.reader.as_deref(), Some("ana"));
}

#[tokio::test]
async fn start_without_start_page_is_invalid_story() {
  let s = store().await;
  let st = story(&s, "Headless").await;
  s.create_page(NewPage::new(st.story_id, "only", "Nothing points here"))
    .await
    .unwrap();

  let err = engine(&s).start(st.story_id, None).await.unwrap_err();
  assert!(matches!(err, CoreError::InvalidStory(id) if id == st.story_id));
}

#[tokio::test]
async fn start_missing_story_is_not_found() {
  let s = store().await;
  let err = engine(&s).start(Uuid::new_v4(), None).await.unwrap_err();
  assert!(matches!(err, CoreError::StoryNotFound(_)));
}

#[tokio::test]
async fn advance_follows_offered_choices_to_an_ending() {
  let s = store().await;
  let f = fixture(&s).await;
  let e = engine(&s);

  let session = e.start(f.story, Some("ana".into())).await.unwrap();
  let session = e.advance(session.session_id, f.to_mid).await.unwrap();
  assert_eq!(session.current_page_id, Some(f.middle));
  assert_eq!(session.state, SessionState::Active);

  let session = e.advance(session.session_id, f.to_good).await.unwrap();
  assert_eq!(session.current_page_id, Some(f.good));
  assert_eq!(session.state, SessionState::Complete);

  let completions = s.list_completions(f.story).await.unwrap();
  assert_eq!(completions.len(), 1);
  assert_eq!(completions[0].ending_page_id, f.good);
  assert_eq!(completions[0].reader.as_deref(), Some("ana"));
}

#[tokio::test]
async fn choice_from_another_page_is_rejected() {
  let s = store().await;
  let f = fixture(&s).await;
  let e = engine(&s);

  let session = e.start(f.story, None).await.unwrap();
  let err = e.advance(session.session_id, f.to_good).await.unwrap_err();
  assert!(matches!(err, CoreError::InvalidChoice { page_id, .. } if page_id == f.start));

  let unchanged = s.get_session(session.session_id).await.unwrap().unwrap();
  assert_eq!(unchanged.current_page_id, Some(f.start));
}

#[tokio::test]
async fn unknown_choice_is_rejected() {
  let s = store().await;
  let f = fixture(&s).await;
  let e = engine(&s);

  let session = e.start(f.story, None).await.unwrap();
  let err = e.advance(session.session_id, Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, CoreError::InvalidChoice { .. }));
}

#[tokio::test]
async fn completed_session_offers_nothing() {
  let s = store().await;
  let f = fixture(&s).await;
  let e = engine(&s);

  // A leftover edge out of an ending is never offered.
  s.create_choice(NewChoice::new(f.good, f.start, "Again", 1)).await.unwrap();

  let session = e.start(f.story, None).await.unwrap();
  e.advance(session.session_id, f.to_mid).await.unwrap();
  e.advance(session.session_id, f.to_good).await.unwrap();

  let view = e.session_view(session.session_id).await.unwrap();
  assert!(view.page.is_ending);
  assert!(view.page.choices.is_empty());

  let back = s.list_choices(f.good).await.unwrap()[0].choice_id;
  let err = e.advance(session.session_id, back).await.unwrap_err();
  assert!(matches!(err, CoreError::InvalidChoice { .. }));
}

#[tokio::test]
async fn advance_unknown_session_is_not_found() {
  let s = store().await;
  let f = fixture(&s).await;
  let err = engine(&s).advance(Uuid::new_v4(), f.to_mid).await.unwrap_err();
  assert!(matches!(err, CoreError::SessionNotFound(_)));
}

#[tokio::test]
async fn completion_is_idempotent_across_sessions() {
  let s = store().await;
  let f = fixture(&s).await;
  let e = engine(&s);

  for _ in 0..2 {
    let session = e.restart(f.story, Some("ana".into())).await.unwrap();
    e.advance(session.session_id, f.to_mid).await.unwrap();
    e.advance(session.session_id, f.to_bad).await.unwrap();
  }

  let completions = s.list_completions(f.story).await.unwrap();
  assert_eq!(completions.len(), 1);
  assert_eq!(completions[0].ending_page_id, f.bad);
}

#[tokio::test]
async fn restart_leaves_previous_session_alone() {
  let s = store().await;
  let f = fixture(&s).await;
  let e = engine(&s);

  let first = e.start(f.story, None).await.unwrap();
  e.advance(first.session_id, f.to_mid).await.unwrap();

  let second = e.restart(f.story, None).await.unwrap();
  assert_ne!(second.session_id, first.session_id);
  assert_eq!(second.current_page_id, Some(f.start));

  let old = s.get_session(first.session_id).await.unwrap().unwrap();
  assert_eq!(old.current_page_id, Some(f.middle));
}

#[tokio::test]
async fn deleting_pages_keeps_sessions_and_completions() {
  let s = store().await;
  let f = fixture(&s).await;
  let e = engine(&s);

  let done = e.start(f.story, Some("ana".into())).await.unwrap();
  e.advance(done.session_id, f.to_mid).await.unwrap();
  e.advance(done.session_id, f.to_good).await.unwrap();
  let live = e.start(f.story, Some("ben".into())).await.unwrap();
  e.advance(live.session_id, f.to_mid).await.unwrap();

  s.delete_page(f.good).await.unwrap();
  s.delete_page(f.middle).await.unwrap();

  let completions = s.list_completions(f.story).await.unwrap();
  assert_eq!(completions.len(), 1);
  assert_eq!(completions[0].ending_page_id, f.good);

  for id in [done.session_id, live.session_id] {
    let session = s.get_session(id).await.unwrap().unwrap();
    assert_eq!(session.current_page_id, None);
    assert_eq!(session.state, SessionState::Active);

    let err = e.session_view(id).await.unwrap_err();
    assert!(matches!(err, CoreError::SessionStranded(sid) if sid == id));
    let err = e.advance(id, f.to_bad).await.unwrap_err();
    assert!(matches!(err, CoreError::SessionStranded(_)));
  }

  // Starting over still works from the surviving start page.
  let fresh = e.restart(f.story, Some("ben".into())).await.unwrap();
  assert_eq!(fresh.current_page_id, Some(f.start));
}

#[tokio::test]
async fn start_on_an_ending_completes_immediately() {
  let s = store().await;
  let st = story(&s, "Short").await;
  let only = s
    .create_page(NewPage::new(st.story_id, "end", "The end.").start().ending(None))
    .await
    .unwrap();

  let session = engine(&s).start(st.story_id, None).await.unwrap();
  assert_eq!(session.state, SessionState::Complete);

  let completions = s.list_completions(st.story_id).await.unwrap();
  assert_eq!(completions.len(), 1);
  assert_eq!(completions[0].ending_page_id, only.page_id);
}

#[tokio::test]
async fn views_present_ordered_choices() {
  let s = store().await;
  let f = fixture(&s).await;
  let e = engine(&s);

  let start = e.start_view(f.story).await.unwrap();
  assert!(start.is_start);
  assert_eq!(start.choices.len(), 1);
  assert_eq!(start.choices[0].target_page_id, f.middle);

  let middle = e.page_view(f.middle).await.unwrap();
  let texts: Vec<_> = middle.choices.iter().map(|c| c.text.as_str()).collect();
  assert_eq!(texts, ["Left", "Right"]);

  let session = e.start(f.story, None).await.unwrap();
  let view = e.session_view(session.session_id).await.unwrap();
  assert_eq!(view.story_title, "Fixture");
  assert_eq!(view.page.page_id, f.start);
}

// ─── Exam Day ────────────────────────────────────────────────────────────────

async fn exam_day(s: &SqliteStore) -> Story {
  let doc = StoryDocument::from_toml(EXAM_DAY).unwrap();
  import_story(s, doc).await.unwrap()
}

#[tokio::test]
async fn exam_day_imports_as_a_clean_graph() {
  let s = store().await;
  let st = exam_day(&s).await;

  assert_eq!(st.status, StoryStatus::Published);
  assert!(st.start_page_id.is_some());

  let snapshot = engine(&s).graph().snapshot(st.story_id).await.unwrap();
  assert_eq!(snapshot.pages.len(), 15);
  let report = graph::validate(&snapshot);
  assert!(report.is_clean(), "unexpected issues: {:?}", report.issues);
}

#[tokio::test]
async fn exam_day_played_to_the_good_ending() {
  let s = store().await;
  let st = exam_day(&s).await;
  let e = engine(&s);

  let session = e.start(st.story_id, Some("student".into())).await.unwrap();
  let picks = [
    "Go to sleep now",
    "Get up and get ready",
    "Check bag quickly and leave",
    "Run to catch the metro",
    "Jump inside at the last second",
    "Revise Python notes",
    "Help her and listen",
    "Run to the building",
  ];

  for text in picks {
    let view = e.session_view(session.session_id).await.unwrap();
    assert_eq!(view.session.state, SessionState::Active);
    let choice = view
      .page
      .choices
      .iter()
      .find(|c| c.text == text)
      .unwrap_or_else(|| panic!("{text:?} not offered on {:?}", view.page.key));
    e.advance(session.session_id, choice.choice_id).await.unwrap();
  }

  let view = e.session_view(session.session_id).await.unwrap();
  assert_eq!(view.page.key, "good_end");
  assert_eq!(view.page.ending_label.as_deref(), Some("On time"));
  assert_eq!(view.session.state, SessionState::Complete);
  assert_eq!(s.list_completions(st.story_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn broken_graph_is_reported() {
  let s = store().await;
  let f = fixture(&s).await;
  s.create_page(NewPage::new(f.story, "island", "No one comes here."))
    .await
    .unwrap();

  let snapshot = engine(&s).graph().snapshot(f.story).await.unwrap();
  let report = graph::validate(&snapshot);
  assert!(report.is_playable());
  assert!(report
    .issues
    .iter()
    .any(|i| matches!(i, GraphIssue::UnreachablePage { key, .. } if key == "island")));
}
