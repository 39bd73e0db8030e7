use chrono::{DateTime, Utc};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::catalog::card::ProductCard;
use crate::catalog::types::Product;
use crate::config::ContactConfig;
use crate::refresh::LoadState;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{category_color, truncate};

/// Everything the gallery needs for one frame
pub struct GalleryProps<'a> {
  /// Projected display list, already filtered and sorted
  pub products: &'a [Product],
  pub summary: &'a str,
  pub state: &'a LoadState,
  /// Whether any catalog has been loaded yet
  pub has_data: bool,
  pub from_cache: bool,
  pub contact: Option<&'a ContactConfig>,
  pub now: DateTime<Utc>,
}

pub fn draw_gallery(frame: &mut Frame, area: Rect, props: &GalleryProps<'_>, list_state: &mut ListState) {
  if !props.has_data {
    draw_blocking_state(frame, area, props.state);
    return;
  }

  let banner = status_banner(props);
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(if banner.is_some() { 1 } else { 0 }),
      Constraint::Min(1),
    ])
    .split(area);

  if let Some(line) = banner {
    frame.render_widget(Paragraph::new(line), chunks[0]);
  }

  if props.products.is_empty() {
    draw_no_results(frame, chunks[1], props.summary);
    return;
  }

  let columns = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
    .split(chunks[1]);

  draw_list(frame, columns[0], props, list_state);

  if let Some(product) = list_state.selected().and_then(|i| props.products.get(i)) {
    let card = ProductCard::new(product, props.now, props.contact);
    draw_detail(frame, columns[1], &card);
  }
}

/// Full-screen state shown while there is nothing to display yet
fn draw_blocking_state(frame: &mut Frame, area: Rect, state: &LoadState) {
  let (title, color, lines) = match state {
    LoadState::WaitingRetry {
      attempt,
      max_attempts,
      error,
      ..
    } => (
      " Connection problem ",
      Color::Yellow,
      vec![
        Line::from(format!("Failed to load products: {}", error)),
        Line::from(""),
        Line::from(format!(
          "Retrying in {}s (attempt {} of {})",
          state.retry_countdown().unwrap_or(0),
          attempt,
          max_attempts
        ))
        .fg(Color::Yellow),
      ],
    ),
    LoadState::Failed { error } => (
      " Unable to load products ",
      Color::Red,
      vec![
        Line::from(error.as_str()),
        Line::from(""),
        Line::from("Press r to try again.").fg(Color::Cyan),
      ],
    ),
    _ => (
      " Products ",
      Color::Blue,
      vec![Line::from("Loading products...").fg(Color::DarkGray)],
    ),
  };

  let block = Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(color));

  let paragraph = Paragraph::new(lines)
    .block(block)
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
  frame.render_widget(paragraph, area);
}

/// One-line notice above the gallery while data is already on screen
fn status_banner(props: &GalleryProps<'_>) -> Option<Line<'static>> {
  let line = match props.state {
    LoadState::Loading { .. } => Line::from(" Refreshing products...").fg(Color::DarkGray),
    LoadState::WaitingRetry { error, .. } => Line::from(format!(
      " Refresh failed: {}. Retrying in {}s",
      error,
      props.state.retry_countdown().unwrap_or(0)
    ))
    .fg(Color::Yellow),
    LoadState::Failed { error } => {
      Line::from(format!(" Refresh failed: {}. Press r to retry", error)).fg(Color::Red)
    }
    LoadState::Ready if props.from_cache => {
      Line::from(" Showing cached products. Press r to refresh").fg(Color::DarkGray)
    }
    _ => return None,
  };
  Some(line)
}

fn draw_no_results(frame: &mut Frame, area: Rect, summary: &str) {
  let block = Block::default()
    .title(format!(" {} ", summary))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let lines = vec![
    Line::from("No Products Found").bold(),
    Line::from("Try adjusting your search or filter criteria.").fg(Color::DarkGray),
    Line::from(""),
    Line::from("Esc clears the search and category").fg(Color::DarkGray),
  ];
  frame.render_widget(
    Paragraph::new(lines)
      .block(block)
      .alignment(Alignment::Center),
    area,
  );
}

fn draw_list(frame: &mut Frame, area: Rect, props: &GalleryProps<'_>, list_state: &mut ListState) {
  ensure_valid_selection(list_state, props.products.len());

  let block = Block::default()
    .title(format!(" {} ", props.summary))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  // Borders, highlight symbol, price and badge columns
  let name_width = (area.width as usize).saturating_sub(2 + 2 + 12 + 16).max(10);

  let items: Vec<ListItem> = props
    .products
    .iter()
    .map(|product| {
      let category = product.category_label();
      ListItem::new(Line::from(vec![
        Span::raw(format!(
          "{:<width$}",
          truncate(product.display_name(), name_width),
          width = name_width
        )),
        Span::styled(
          format!("{:>11} ", truncate(&product.formatted_price(), 11)),
          Style::default().fg(Color::Green),
        ),
        Span::styled(
          truncate(category, 15),
          Style::default().fg(category_color(category)),
        ),
      ]))
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  frame.render_stateful_widget(list, area, list_state);
}

fn draw_detail(frame: &mut Frame, area: Rect, card: &ProductCard) {
  let block = Block::default()
    .title(format!(" {} ", card.title))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));

  let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));

  let mut lines = vec![
    Line::from(vec![
      Span::styled(card.price.clone(), Style::default().fg(Color::Green).bold()),
      Span::raw("  "),
      Span::styled(
        format!("[{}]", card.badge),
        Style::default().fg(category_color(&card.badge)),
      ),
    ]),
    Line::from(""),
    Line::from(card.description.clone()),
    Line::from(""),
    Line::from(vec![label("Added    "), Span::raw(card.time_ago.clone())]),
    Line::from(vec![label("Date     "), Span::raw(card.created_label.clone())]),
    Line::from(vec![label("Image    "), Span::raw(card.image_url.clone())]),
    Line::from(vec![label("ID       "), Span::raw(card.id.clone())]),
  ];

  if let Some(url) = &card.contact_url {
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
      label("Contact  "),
      Span::styled(url.clone(), Style::default().fg(Color::Cyan)),
    ]));
  }

  frame.render_widget(
    Paragraph::new(lines)
      .block(block)
      .wrap(Wrap { trim: false }),
    area,
  );
}
