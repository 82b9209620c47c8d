//! TUI rendering — orchestrates all panes.

pub mod create;
pub mod event_list;
pub mod login;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};

use crate::{
  app::{App, GateStatus},
  router::Route,
};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let area = f.area();

  // Vertical stack: header, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  draw_body(f, rows[1], app);
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let left = Span::styled(
    " evently  [^N] create  [^E] my events",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );

  let right_text = match app.identity.identity() {
    Some(identity) => format!("{}  [^O] sign out ", identity.label()),
    None => format!("{} ", Local::now().format("%Y-%m-%d")),
  };
  let right = Span::styled(right_text, Style::default().fg(Color::Gray));

  let left_width = left.content.chars().count() as u16;
  let right_width = right.content.chars().count() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![
    left,
    Span::raw(" ".repeat(pad as usize)),
    right,
  ]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Body ─────────────────────────────────────────────────────────────────────

fn draw_body(f: &mut Frame, area: Rect, app: &App) {
  match app.gate_status() {
    Some(GateStatus::Loading) => {
      draw_placeholder(f, area, "Loading...");
      return;
    }
    // A redirect is already under way.
    Some(GateStatus::Redirected) => return,
    Some(GateStatus::Protected) | None => {}
  }

  match app.router.route() {
    Route::Create => create::draw(f, area, app),
    Route::Events => event_list::draw(f, area, app),
    Route::Login => login::draw(f, area, app),
    Route::NotFound => draw_placeholder(f, area, "Page not found. Press any key to go home."),
  }
}

fn draw_placeholder(f: &mut Frame, area: Rect, text: &str) {
  f.render_widget(
    Paragraph::new(Line::from(Span::styled(
      text.to_string(),
      Style::default().fg(Color::DarkGray),
    )))
    .centered(),
    centered_rows(area, 1),
  );
}

/// A horizontal band of `height` rows in the vertical middle of `area`.
pub(crate) fn centered_rows(area: Rect, height: u16) -> Rect {
  let height = height.min(area.height);
  Rect {
    x: area.x,
    y: area.y + (area.height - height) / 2,
    width: area.width,
    height,
  }
}

/// A box of at most `width` × `height` centred in `area`.
pub(crate) fn centered_box(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let band = centered_rows(area, height);
  Rect {
    x: area.x + (area.width - width) / 2,
    width,
    ..band
  }
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let (mode_label, hints) = match app.router.route() {
    Route::Events if app.filter_active => (
      "SEARCH",
      "Type to filter  Esc clear  Enter keep",
    ),
    Route::Events => (
      "EVENTS",
      "↑↓/jk navigate  / search  n new event  q quit",
    ),
    Route::Create => (
      "CREATE",
      "Tab switch field  Enter next/create  ^S create  Esc clear",
    ),
    Route::Login => (
      "LOGIN",
      "Tab switch field  Enter sign in  Esc clear  ^C quit",
    ),
    Route::NotFound => ("404", "any key home  q quit"),
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::DarkGray),
  );

  let line = Line::from(vec![mode_span, hint_span]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}
