//! The create-event form.

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Style},
  widgets::{Block, Borders, Paragraph, Wrap},
};

use super::centered_box;
use crate::app::{App, CreateField};

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let form = &app.create;
  let outer = Block::default()
    .title(" Create event ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let boxed = centered_box(area, 72, 14);
  let inner = outer.inner(boxed);
  f.render_widget(outer, boxed);

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(3), // title
      Constraint::Min(3),    // description
      Constraint::Length(1), // error
    ])
    .split(inner);

  let field = |label: &'static str, which: CreateField| {
    let focused = form.focus == which;
    Block::default()
      .title(format!(" {label} "))
      .borders(Borders::ALL)
      .border_style(if focused {
        Style::default().fg(Color::Yellow)
      } else {
        Style::default().fg(Color::DarkGray)
      })
  };
  let cursor = |which: CreateField| if form.focus == which { "_" } else { "" };

  f.render_widget(
    Paragraph::new(format!("{}{}", form.title, cursor(CreateField::Title)))
      .block(field("Title", CreateField::Title)),
    rows[0],
  );
  f.render_widget(
    Paragraph::new(format!("{}{}", form.description, cursor(CreateField::Description)))
      .wrap(Wrap { trim: false })
      .block(field("Description", CreateField::Description)),
    rows[1],
  );

  if let Some(error) = &form.error {
    f.render_widget(
      Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
      rows[2],
    );
  }
}
