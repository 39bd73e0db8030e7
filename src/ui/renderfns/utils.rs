use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

const BADGE_COLORS: &[Color] = &[
  Color::Cyan,
  Color::Magenta,
  Color::Green,
  Color::Yellow,
  Color::Blue,
  Color::LightRed,
];

/// Stable badge color for a category label
pub fn category_color(category: &str) -> Color {
  if category == crate::catalog::types::UNCATEGORIZED {
    return Color::Gray;
  }
  let hash = category
    .bytes()
    .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
  BADGE_COLORS[hash % BADGE_COLORS.len()]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("crème brûlée", 8), "crème...");
  }

  #[test]
  fn test_category_color_is_stable() {
    assert_eq!(category_color("laptops"), category_color("laptops"));
    assert_eq!(category_color("Uncategorized"), Color::Gray);
  }
}
