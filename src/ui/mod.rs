pub mod components;
pub mod renderfns;
mod views;

use crate::app::App;
use crate::catalog::format::format_time_ago;
use chrono::Utc;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use renderfns::{draw_footer, draw_header, HeaderInfo};
use views::{draw_gallery, GalleryProps};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(2), // Header
      Constraint::Min(1),    // Gallery
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let now = Utc::now();
  let title = app.config().display_title();
  let updated = match app.controller().store().loaded_at() {
    Some(at) => format_time_ago(Some(at), now),
    None => "never".to_string(),
  };

  draw_header(
    frame,
    chunks[0],
    &HeaderInfo {
      title: &title,
      feed_url: &app.config().feed.url,
      stats: app.stats(),
      updated: &updated,
      from_cache: app.from_cache(),
    },
  );

  // The list state is borrowed mutably alongside the props
  let summary = app.summary();
  let mut list_state = std::mem::take(app.list_state_mut());
  {
    let controller = app.controller();
    let props = GalleryProps {
      products: app.visible(),
      summary: &summary,
      state: controller.state(),
      has_data: controller.store().has_data(),
      from_cache: app.from_cache(),
      contact: app.config().contact.as_ref(),
      now,
    };
    draw_gallery(frame, chunks[1], &props, &mut list_state);
  }
  *app.list_state_mut() = list_state;

  let hints = app.hints();
  draw_footer(frame, chunks[2], &hints, app.controller().notification());

  // Overlays last so they sit on top
  let area = frame.area();
  app.search().render_overlay(frame, area);
  app.picker().render_overlay(frame, area);
  app.command().render_overlay(frame, area);
}

/// Keep the selection inside `0..len`, or clear it when there is nothing to select.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}
