use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer: key hints on the left, a transient notification on
/// the right
pub fn draw_footer(frame: &mut Frame, area: Rect, hints: &[(&str, &str)], notification: Option<&str>) {
  let mut spans = vec![Span::raw(" ")];

  for (i, (key, label)) in hints.iter().enumerate() {
    if i > 0 {
      spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(format!(" {}", label), Style::default().fg(Color::DarkGray)));
  }

  frame.render_widget(
    Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black)),
    area,
  );

  if let Some(message) = notification {
    let note = Line::from(Span::styled(
      format!(" {} ", message),
      Style::default().fg(Color::Black).bg(Color::Green).bold(),
    ))
    .alignment(Alignment::Right);
    frame.render_widget(Paragraph::new(note), area);
  }
}
