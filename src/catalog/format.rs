//! Display formatting for prices, dates and sizes.

use chrono::{DateTime, Utc};

/// Parse the leading decimal number of a string, ignoring anything after it.
///
/// `"10.50 USD"` parses as `10.5`; `"USD 10"` does not parse.
pub fn parse_leading_number(raw: &str) -> Option<f64> {
  let s = raw.trim_start();
  let mut end = 0;
  let mut seen_digit = false;
  let mut seen_dot = false;

  for (i, c) in s.char_indices() {
    match c {
      '+' | '-' if i == 0 => {}
      '0'..='9' => seen_digit = true,
      '.' if !seen_dot => seen_dot = true,
      _ => break,
    }
    end = i + c.len_utf8();
  }

  if !seen_digit {
    return None;
  }

  s[..end].trim_end_matches('.').parse().ok()
}

/// Numeric price used for sorting and statistics. Missing or unparseable is 0.
pub fn price_value(raw: Option<&str>) -> f64 {
  raw.and_then(parse_leading_number).unwrap_or(0.0)
}

/// Format a raw price string for display.
///
/// Missing and `0.00` prices are shown as `Free`. Prices that are not
/// numbers are shown verbatim behind a dollar sign.
pub fn format_price(raw: Option<&str>) -> String {
  let raw = match raw {
    Some(r) if !r.is_empty() && r != "0.00" => r,
    _ => return "Free".to_string(),
  };

  match parse_leading_number(raw) {
    Some(n) => format!("${}", group_thousands(n)),
    None => format!("${}", raw),
  }
}

/// Two decimals with comma thousands separators, e.g. `1,234.50`.
fn group_thousands(n: f64) -> String {
  let fixed = format!("{:.2}", n.abs());
  let (int_part, frac_part) = fixed.split_once('.').unwrap_or((&fixed, "00"));

  let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
  for (i, c) in int_part.chars().enumerate() {
    if i > 0 && (int_part.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(c);
  }

  let sign = if n < 0.0 { "-" } else { "" };
  format!("{}{}.{}", sign, grouped, frac_part)
}

/// Absolute date in the `Jan 1, 2024, 12:00 AM` style.
pub fn format_date(date: Option<DateTime<Utc>>) -> String {
  match date {
    Some(d) => d.format("%b %-d, %Y, %I:%M %p").to_string(),
    None => "Unknown".to_string(),
  }
}

/// Relative time such as `5 minutes ago`; older than a week falls back to
/// the absolute date.
pub fn format_time_ago(date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
  let Some(date) = date else {
    return "Unknown".to_string();
  };

  let diff = now - date;
  let mins = diff.num_minutes();
  let hours = diff.num_hours();
  let days = diff.num_days();

  if mins < 1 {
    "Just now".to_string()
  } else if mins < 60 {
    format!("{} minute{} ago", mins, plural(mins))
  } else if hours < 24 {
    format!("{} hour{} ago", hours, plural(hours))
  } else if days < 7 {
    format!("{} day{} ago", days, plural(days))
  } else {
    format_date(Some(date))
  }
}

fn plural(n: i64) -> &'static str {
  if n > 1 {
    "s"
  } else {
    ""
  }
}

/// Human-readable byte size, e.g. `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
  const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

  if bytes == 0 {
    return "0 Bytes".to_string();
  }

  let mut value = bytes as f64;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }

  let fixed = format!("{:.2}", value);
  let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
  format!("{} {}", trimmed, UNITS[unit])
}
