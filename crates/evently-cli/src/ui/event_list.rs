//! The signed-in user's events, newest first.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::app::App;

/// Render the event list into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let total = app
    .events
    .as_ref()
    .map_or(0, |events| events.view().records.len());
  let filtered = app.filtered_records();

  let title = if app.filter_active || !app.filter.is_empty() {
    format!(" My events ({}/{}) ", filtered.len(), total)
  } else {
    format!(" My events ({total}) ")
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let mut inner = block.inner(area);
  f.render_widget(block, area);

  let loading = app
    .events
    .as_ref()
    .is_none_or(|events| events.view().is_loading());
  if loading {
    f.render_widget(
      Paragraph::new("Loading events...").style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  }

  if total == 0 {
    f.render_widget(
      Paragraph::new(vec![
        Line::from(Span::styled(
          "No events yet",
          Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
          "Press n (or ^N) to create your first event.",
          Style::default().fg(Color::DarkGray),
        )),
      ]),
      inner,
    );
    return;
  }

  // Filter bar on the last inner row.
  if (app.filter_active || !app.filter.is_empty()) && inner.height > 2 {
    let filter_area = Rect {
      y: inner.y + inner.height - 1,
      height: 1,
      ..inner
    };
    inner.height -= 1;

    let filter_text = if app.filter_active {
      format!("/{}_", app.filter)
    } else {
      format!("/{}", app.filter)
    };
    f.render_widget(
      Paragraph::new(filter_text).style(Style::default().fg(Color::Yellow)),
      filter_area,
    );
  }

  let items: Vec<ListItem> = filtered
    .iter()
    .map(|record| {
      let created = app.date_format.render(record.created_at.as_ref());
      ListItem::new(vec![
        Line::from(vec![
          Span::styled(
            record.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
          ),
          Span::styled(format!("  {created}"), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(Span::styled(
          record.description.clone(),
          Style::default().fg(Color::Gray),
        )),
        Line::from(""),
      ])
    })
    .collect();

  let mut state = ListState::default();
  state.select((!filtered.is_empty()).then_some(app.list_cursor));

  f.render_stateful_widget(
    List::new(items)
      .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
      .highlight_symbol("▍"),
    inner,
    &mut state,
  );
}
