use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::catalog::stats::CatalogStats;

/// What the header shows besides the shortcuts
pub struct HeaderInfo<'a> {
  pub title: &'a str,
  pub feed_url: &'a str,
  pub stats: &'a CatalogStats,
  /// Relative time of the last successful load
  pub updated: &'a str,
  pub from_cache: bool,
}

/// Draw the two-line header: shop context on top, catalog stats below
pub fn draw_header(frame: &mut Frame, area: Rect, info: &HeaderInfo<'_>) {
  let sep = || Span::styled("│", Style::default().fg(Color::DarkGray));

  let top = Line::from(vec![
    Span::styled(" vitrine ", Style::default().fg(Color::Cyan).bold()),
    sep(),
    Span::styled(
      format!(" {} ", info.title),
      Style::default().fg(Color::Yellow).bold(),
    ),
    sep(),
    Span::styled(
      format!(" {} ", extract_domain(info.feed_url)),
      Style::default().fg(Color::White),
    ),
    Span::raw("  "),
    // Shortcuts - keys highlighted, descriptions dimmed
    Span::styled("</>", Style::default().fg(Color::Cyan)),
    Span::styled(" search", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("<c>", Style::default().fg(Color::Cyan)),
    Span::styled(" category", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("<s>", Style::default().fg(Color::Cyan)),
    Span::styled(" sort", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("<r>", Style::default().fg(Color::Cyan)),
    Span::styled(" refresh", Style::default().fg(Color::DarkGray)),
  ]);

  let stats = info.stats;
  let mut bottom = vec![
    Span::raw(" "),
    stat(&stats.products.to_string(), "products"),
    Span::raw("  "),
    stat(&stats.categories.to_string(), "categories"),
    Span::raw("  "),
    stat(&stats.price_range_label(), "price range"),
    Span::raw("  "),
    stat(&stats.total_size_label(), "images"),
    Span::raw("  "),
    Span::styled(
      format!("updated {}", info.updated.to_lowercase()),
      Style::default().fg(Color::DarkGray),
    ),
  ];
  if info.from_cache {
    bottom.push(Span::styled(" (cached)", Style::default().fg(Color::DarkGray)));
  }

  let paragraph = Paragraph::new(vec![top, Line::from(bottom)]).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn stat(value: &str, label: &str) -> Span<'static> {
  Span::styled(
    format!("{} {}", value, label),
    Style::default().fg(Color::White),
  )
}

/// Host part of a URL, used to show which shop the feed comes from
pub fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split(['/', '?'])
    .next()
    .unwrap_or(url)
}
