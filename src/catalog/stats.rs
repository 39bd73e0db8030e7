use std::collections::HashSet;

use super::format::{format_bytes, parse_leading_number};
use super::types::Product;

/// Summary figures shown above the gallery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogStats {
  pub products: usize,
  pub categories: usize,
  /// (min, max) over parseable prices; missing prices count as 0
  pub price_range: Option<(f64, f64)>,
  pub total_bytes: u64,
}

impl CatalogStats {
  pub fn compute(products: &[Product]) -> Self {
    let categories: HashSet<&str> = products.iter().map(|p| p.category_label()).collect();

    let price_range = products
      .iter()
      .filter_map(|p| match p.price.as_deref() {
        None | Some("") => Some(0.0),
        Some(raw) => parse_leading_number(raw),
      })
      .fold(None, |range: Option<(f64, f64)>, price| match range {
        None => Some((price, price)),
        Some((min, max)) => Some((min.min(price), max.max(price))),
      });

    Self {
      products: products.len(),
      categories: categories.len(),
      price_range,
      total_bytes: products.iter().map(|p| p.bytes).sum(),
    }
  }

  pub fn price_range_label(&self) -> String {
    match self.price_range {
      Some((min, max)) => format!("${:.2} - ${:.2}", min, max),
      None => "No prices".to_string(),
    }
  }

  pub fn total_size_label(&self) -> String {
    format_bytes(self.total_bytes)
  }
}
