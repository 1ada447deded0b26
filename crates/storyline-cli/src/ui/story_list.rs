//! Story list pane, left panel.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::app::{App, Screen};

/// Render the story list into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let filtered = app.filtered_stories();
  let total = app.stories.len();

  let title = if app.filter_active || !app.filter.is_empty() {
    format!(" Stories ({}/{}) ", filtered.len(), total)
  } else {
    format!(" Stories ({total}) ")
  };

  let border = if app.screen == Screen::StoryList { Color::Gray } else { Color::DarkGray };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border));

  let items: Vec<ListItem> = filtered
    .iter()
    .map(|story| {
      let author = story.author.as_deref().unwrap_or("anonymous");
      ListItem::new(vec![
        Line::from(Span::raw(story.title.clone())),
        Line::from(Span::styled(
          format!("  {author}  {}", story.tags.join(", ")),
          Style::default().fg(Color::DarkGray),
        )),
      ])
    })
    .collect();

  let mut inner_area = block.inner(area);
  f.render_widget(block, area);

  if (app.filter_active || !app.filter.is_empty()) && inner_area.height > 2 {
    let filter_area = Rect {
      x:      inner_area.x,
      y:      inner_area.y + inner_area.height - 1,
      width:  inner_area.width,
      height: 1,
    };
    inner_area.height = inner_area.height.saturating_sub(1);

    let cursor = if app.filter_active { "_" } else { "" };
    f.render_widget(
      Paragraph::new(format!("/{}{cursor}", app.filter)).style(Style::default().fg(Color::Yellow)),
      filter_area,
    );
  }

  let mut state = ListState::default();
  state.select((!filtered.is_empty()).then_some(app.list_cursor));

  f.render_stateful_widget(
    List::new(items).highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    inner_area,
    &mut state,
  );
}
