//! Display model for a single product, shared by the terminal gallery and
//! the static export.

use chrono::{DateTime, Utc};
use url::Url;

use super::format::{format_date, format_time_ago};
use super::types::Product;
use crate::config::ContactConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
  pub id: String,
  pub title: String,
  pub price: String,
  pub badge: String,
  pub description: String,
  pub image_url: String,
  pub time_ago: String,
  pub created_label: String,
  pub contact_url: Option<String>,
}

impl ProductCard {
  pub fn new(product: &Product, now: DateTime<Utc>, contact: Option<&ContactConfig>) -> Self {
    Self {
      id: product.id.clone(),
      title: product.display_name().to_string(),
      price: product.formatted_price(),
      badge: product.category_label().to_string(),
      description: product.description_text().to_string(),
      image_url: product.image_src().to_string(),
      time_ago: format_time_ago(product.created_at, now),
      created_label: format_date(product.created_at),
      contact_url: contact.and_then(|c| contact_link(&c.whatsapp_phone, product.display_name())),
    }
  }
}

/// Build cards for an ordered display list.
pub fn cards(products: &[Product], now: DateTime<Utc>, contact: Option<&ContactConfig>) -> Vec<ProductCard> {
  products
    .iter()
    .map(|p| ProductCard::new(p, now, contact))
    .collect()
}

/// WhatsApp click-to-chat link asking about a product.
pub fn contact_link(phone: &str, product_name: &str) -> Option<String> {
  let base = format!("https://wa.me/{}", phone.trim_start_matches('+'));
  let text = format!("I'm interested in {}", product_name);
  Url::parse_with_params(&base, &[("text", text)])
    .ok()
    .map(String::from)
}
