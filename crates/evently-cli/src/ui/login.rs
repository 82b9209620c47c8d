//! Sign-in form.

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Style},
  widgets::{Block, Borders, Paragraph},
};

use super::centered_box;
use crate::app::{App, LoginField};

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let form = &app.login;
  let outer = Block::default()
    .title(" Sign in to evently ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let boxed = centered_box(area, 48, 10);
  let inner = outer.inner(boxed);
  f.render_widget(outer, boxed);

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(3), // username
      Constraint::Length(3), // password
      Constraint::Length(1), // error
    ])
    .split(inner);

  let border = |which: LoginField| {
    if form.focus == which {
      Style::default().fg(Color::Yellow)
    } else {
      Style::default().fg(Color::DarkGray)
    }
  };
  let cursor = |which: LoginField| if form.focus == which { "_" } else { "" };

  f.render_widget(
    Paragraph::new(format!("{}{}", form.username, cursor(LoginField::Username))).block(
      Block::default()
        .title(" Username ")
        .borders(Borders::ALL)
        .border_style(border(LoginField::Username)),
    ),
    rows[0],
  );
  // Never echo the password itself.
  let masked = "*".repeat(form.password.chars().count());
  f.render_widget(
    Paragraph::new(format!("{masked}{}", cursor(LoginField::Password))).block(
      Block::default()
        .title(" Password ")
        .borders(Borders::ALL)
        .border_style(border(LoginField::Password)),
    ),
    rows[1],
  );

  if let Some(error) = &form.error {
    f.render_widget(
      Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
      rows[2],
    );
  }
}
