use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::format;

/// Category label for products without one
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Image shown when a product has no usable URL
pub const PLACEHOLDER_IMAGE: &str =
  "https://images.unsplash.com/photo-1517336714731-489689fd1ca8?w=400&q=80";

/// A catalog product as published in the feed.
///
/// Products are replaced as a whole set on every successful fetch and are
/// never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  /// Media host public id (e.g. "accessories/mouse")
  pub id: String,
  pub name: Option<String>,
  /// Price as entered by the operator, unformatted
  pub price: Option<String>,
  pub description: Option<String>,
  pub category: Option<String>,
  pub image_url: Option<String>,
  pub filename: Option<String>,
  pub format: Option<String>,
  #[serde(default)]
  pub bytes: u64,
  pub created_at: Option<DateTime<Utc>>,
}

impl Product {
  pub fn display_name(&self) -> &str {
    non_empty(&self.name).unwrap_or("Unnamed Product")
  }

  pub fn description_text(&self) -> &str {
    non_empty(&self.description).unwrap_or("No description available")
  }

  /// Category used for filtering and badges.
  pub fn category_label(&self) -> &str {
    non_empty(&self.category).unwrap_or(UNCATEGORIZED)
  }

  pub fn image_src(&self) -> &str {
    non_empty(&self.image_url).unwrap_or(PLACEHOLDER_IMAGE)
  }

  pub fn price_value(&self) -> f64 {
    format::price_value(self.price.as_deref())
  }

  pub fn formatted_price(&self) -> String {
    format::format_price(self.price.as_deref())
  }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().filter(|s| !s.is_empty())
}
