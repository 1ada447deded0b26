//! Page pane, right panel: the current page and its choices.

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};
use storyline_core::view::SessionView;

/// Render `view` into `area`, highlighting the choice at `cursor`.
pub fn draw(f: &mut Frame, area: Rect, view: &SessionView, cursor: usize) {
  let page = &view.page;

  let block = Block::default()
    .title(format!(" {} ", page.key))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Gray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let choice_rows = if page.is_ending { 2 } else { page.choices.len() as u16 + 1 };
  let parts = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Min(0), Constraint::Length(choice_rows)])
    .split(inner);

  f.render_widget(
    Paragraph::new(page.content.as_str()).wrap(Wrap { trim: false }),
    parts[0],
  );

  let mut lines = vec![Line::from("")];
  if page.is_ending {
    let label = page.ending_label.as_deref().unwrap_or("The end");
    lines.push(Line::from(Span::styled(
      format!("★ {label}  (r to play again)"),
      Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD),
    )));
  } else {
    for (i, choice) in page.choices.iter().enumerate() {
      let style = if i == cursor {
        Style::default()
          .bg(Color::Blue)
          .fg(Color::White)
          .add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(Color::Cyan)
      };
      lines.push(Line::from(Span::styled(format!(" {}. {} ", i + 1, choice.text), style)));
    }
  }
  f.render_widget(Paragraph::new(lines), parts[1]);
}
