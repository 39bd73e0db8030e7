//! Serde-deserializable types matching the product feed.
//!
//! The feed is a media-host resource listing. These types stay separate
//! from `Product` so the domain type only carries what the storefront uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::types::Product;

// ============================================================================
// Feed resources
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ApiCustomContext {
  #[serde(default, deserialize_with = "string_or_number")]
  pub name: Option<String>,
  #[serde(default, deserialize_with = "string_or_number")]
  pub price: Option<String>,
  #[serde(default, deserialize_with = "string_or_number")]
  pub description: Option<String>,
  #[serde(default, deserialize_with = "string_or_number")]
  pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiContext {
  #[serde(default)]
  pub custom: ApiCustomContext,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiProductResource {
  #[serde(default)]
  pub public_id: String,
  pub secure_url: Option<String>,
  pub url: Option<String>,
  pub format: Option<String>,
  #[serde(default)]
  pub bytes: u64,
  pub created_at: Option<String>,
  pub filename: Option<String>,
  #[serde(default)]
  pub context: ApiContext,
}

impl ApiProductResource {
  pub fn into_product(self) -> Product {
    let created_at = self.created_at.as_deref().and_then(parse_timestamp);
    let custom = self.context.custom;

    Product {
      id: self.public_id,
      name: custom.name,
      price: custom.price,
      description: custom.description,
      category: custom.category,
      image_url: self.secure_url.or(self.url),
      filename: self.filename,
      format: self.format.map(|f| f.to_lowercase()),
      bytes: self.bytes,
      created_at,
    }
  }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .ok()
}

/// Operators sometimes type prices as JSON numbers; accept both.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
  Ok(match value {
    Some(serde_json::Value::String(s)) => Some(s),
    Some(serde_json::Value::Number(n)) => Some(n.to_string()),
    Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
    _ => None,
  })
}

// ============================================================================
// Media upload response
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUploadResponse {
  pub public_id: String,
  pub secure_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  pub error: ApiErrorMessage,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorMessage {
  pub message: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resource_into_product() {
    let json = r#"{
      "public_id": "accessories/mouse",
      "secure_url": "https://cdn.example.com/mouse.jpg",
      "format": "JPG",
      "bytes": 2048,
      "created_at": "2024-01-01T00:00:00Z",
      "context": { "custom": { "name": "Mouse", "price": "10.00", "category": "accessories" } }
    }"#;
    let resource: ApiProductResource = serde_json::from_str(json).unwrap();
    let product = resource.into_product();

    assert_eq!(product.id, "accessories/mouse");
    assert_eq!(product.name.as_deref(), Some("Mouse"));
    assert_eq!(product.price.as_deref(), Some("10.00"));
    assert_eq!(product.category.as_deref(), Some("accessories"));
    assert_eq!(product.format.as_deref(), Some("jpg"));
    assert_eq!(product.bytes, 2048);
    assert_eq!(
      product.created_at.map(|d| d.to_rfc3339()),
      Some("2024-01-01T00:00:00+00:00".to_string())
    );
  }

  #[test]
  fn test_numeric_price_and_missing_context() {
    let resource: ApiProductResource =
      serde_json::from_str(r#"{"public_id": "a", "context": {"custom": {"price": 25}}}"#).unwrap();
    assert_eq!(resource.into_product().price.as_deref(), Some("25"));

    let bare: ApiProductResource = serde_json::from_str(r#"{"public_id": "b"}"#).unwrap();
    let product = bare.into_product();
    assert!(product.name.is_none());
    assert!(product.created_at.is_none());
  }

  #[test]
  fn test_falls_back_to_plain_url() {
    let resource: ApiProductResource =
      serde_json::from_str(r#"{"public_id": "a", "url": "http://cdn.example.com/a.png"}"#).unwrap();
    assert_eq!(
      resource.into_product().image_url.as_deref(),
      Some("http://cdn.example.com/a.png")
    );
  }

  #[test]
  fn test_unparseable_date_is_none() {
    let resource: ApiProductResource =
      serde_json::from_str(r#"{"public_id": "a", "created_at": "yesterday"}"#).unwrap();
    assert!(resource.into_product().created_at.is_none());
  }
}
