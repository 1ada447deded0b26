//! Read models handed to renderers. Never stored, always derived.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  graph::{is_ending, order_choices},
  session::PlaySession,
  story::{Choice, Page},
};

/// One option offered to the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceView {
  pub choice_id:      Uuid,
  pub text:           String,
  pub order:          i32,
  pub target_page_id: Uuid,
}

/// A page's content together with the options the reader may pick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageView {
  pub page_id:      Uuid,
  pub story_id:     Uuid,
  pub key:          String,
  pub content:      String,
  pub is_start:     bool,
  pub is_ending:    bool,
  pub ending_label: Option<String>,
  /// Empty for ending pages.
  pub choices:      Vec<ChoiceView>,
}

impl PageView {
  /// Compose the view of `page` from its outgoing `choices`.
  ///
  /// Choices are presented in graph order; an ending page presents none even
  /// if choices still exist in storage.
  pub fn project(page: Page, mut choices: Vec<Choice>) -> Self {
    let choices = if is_ending(&page) {
      Vec::new()
    } else {
      order_choices(&mut choices);
      choices
        .into_iter()
        .filter(|c| c.from_page_id == page.page_id)
        .map(|c| ChoiceView {
          choice_id:      c.choice_id,
          text:           c.text,
          order:          c.order,
          target_page_id: c.to_page_id,
        })
        .collect()
    };

    Self {
      page_id: page.page_id,
      story_id: page.story_id,
      key: page.key,
      content: page.content,
      is_start: page.is_start,
      is_ending: page.is_ending,
      ending_label: page.ending_label,
      choices,
    }
  }
}

/// Everything a renderer needs to draw a session's current position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
  pub session:     PlaySession,
  pub story_title: String,
  pub page:        PageView,
}
