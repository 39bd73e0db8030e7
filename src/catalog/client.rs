use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use super::api_types::ApiProductResource;
use super::types::Product;
use crate::config::FeedConfig;

/// Why a feed fetch failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
  /// No response within the configured timeout
  #[error("Request timed out after {}ms", .0.as_millis())]
  Timeout(Duration),

  /// Non-2xx response
  #[error("HTTP {status}: {reason}")]
  Http { status: u16, reason: String },

  /// Body was not JSON or had no `resources` array
  #[error("Invalid data format: {0}")]
  InvalidFormat(String),

  /// Connection, TLS or body transfer failure
  #[error("Network error: {0}")]
  Network(String),
}

impl FetchError {
  fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
    if e.is_timeout() {
      FetchError::Timeout(timeout)
    } else {
      FetchError::Network(e.to_string())
    }
  }
}

/// HTTP client for the product feed
#[derive(Clone)]
pub struct FeedClient {
  http: reqwest::Client,
  url: Url,
  timeout: Duration,
}

impl FeedClient {
  pub fn new(config: &FeedConfig) -> Result<Self> {
    let url = Url::parse(&config.url)
      .map_err(|e| eyre!("Invalid feed URL {}: {}", config.url, e))?;

    Self::with_timeout(url, Duration::from_secs(config.timeout_secs))
  }

  pub fn with_timeout(url: Url, timeout: Duration) -> Result<Self> {
    let http = reqwest::Client::builder()
      .user_agent(concat!("vitrine/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, url, timeout })
  }

  /// Feed URL with the `v` query parameter.
  ///
  /// With `bust_cache` the parameter carries the current time so
  /// intermediate HTTP caches cannot serve an old copy.
  pub fn request_url(&self, bust_cache: bool) -> Url {
    let mut url = self.url.clone();
    let version = if bust_cache {
      Utc::now().timestamp_millis().to_string()
    } else {
      String::new()
    };
    url.query_pairs_mut().append_pair("v", &version);
    url
  }

  /// Fetch and validate the product feed.
  #[instrument(skip(self), fields(feed = %self.url))]
  pub async fn fetch(&self, bust_cache: bool) -> Result<Vec<Product>, FetchError> {
    let url = self.request_url(bust_cache);
    let timeout = self.timeout;

    let request = async {
      let response = self
        .http
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(e, timeout))?;

      let status = response.status();
      if !status.is_success() {
        return Err(FetchError::Http {
          status: status.as_u16(),
          reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
      }

      response
        .bytes()
        .await
        .map_err(|e| FetchError::from_reqwest(e, timeout))
    };

    let body = tokio::time::timeout(timeout, request)
      .await
      .map_err(|_| FetchError::Timeout(timeout))??;

    let products = parse_feed(&body)?;
    debug!(count = products.len(), "Fetched product feed");
    Ok(products)
  }
}

/// Validate a feed body and convert its resources to products.
///
/// The body must be a JSON object with a `resources` array. Individual
/// entries that are not resource objects are skipped.
pub fn parse_feed(body: &[u8]) -> Result<Vec<Product>, FetchError> {
  let value: serde_json::Value =
    serde_json::from_slice(body).map_err(|e| FetchError::InvalidFormat(e.to_string()))?;

  let resources = value
    .get("resources")
    .and_then(|r| r.as_array())
    .ok_or_else(|| FetchError::InvalidFormat("missing resources array".to_string()))?;

  let products = resources
    .iter()
    .filter_map(
      |resource| match serde_json::from_value::<ApiProductResource>(resource.clone()) {
        Ok(r) => Some(r.into_product()),
        Err(e) => {
          warn!(error = %e, "Skipping malformed feed entry");
          None
        }
      },
    )
    .collect();

  Ok(products)
}
