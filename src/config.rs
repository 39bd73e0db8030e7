use color_eyre::{eyre::eyre, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::view::SortKey;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Custom title for header and exported pages (defaults to the feed host)
  pub title: Option<String>,
  pub feed: FeedConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub refresh: RefreshConfig,
  pub media: Option<MediaConfig>,
  pub workflow: Option<WorkflowConfig>,
  pub contact: Option<ContactConfig>,
  /// Initial sort order (name-asc, price-desc, date-newest, ...)
  pub default_sort: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
  pub url: String,
  #[serde(default = "default_feed_timeout")]
  pub timeout_secs: u64,
}

fn default_feed_timeout() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  #[serde(default = "default_cache_ttl")]
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      ttl_secs: default_cache_ttl(),
    }
  }
}

fn default_true() -> bool {
  true
}

fn default_cache_ttl() -> u64 {
  60 * 60
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  #[serde(default = "default_retry_delay")]
  pub retry_delay_secs: u64,
  #[serde(default = "default_background_delay")]
  pub background_delay_secs: u64,
  /// Periodic silent refresh interval
  #[serde(default = "default_refresh_interval")]
  pub interval_secs: u64,
  #[serde(default = "default_notification")]
  pub notification_secs: u64,
  #[serde(default = "default_debounce")]
  pub search_debounce_ms: u64,
}

impl Default for RefreshConfig {
  fn default() -> Self {
    Self {
      max_retries: default_max_retries(),
      retry_delay_secs: default_retry_delay(),
      background_delay_secs: default_background_delay(),
      interval_secs: default_refresh_interval(),
      notification_secs: default_notification(),
      search_debounce_ms: default_debounce(),
    }
  }
}

impl RefreshConfig {
  pub fn search_debounce(&self) -> Duration {
    Duration::from_millis(self.search_debounce_ms)
  }
}

fn default_max_retries() -> u32 {
  3
}

fn default_retry_delay() -> u64 {
  5
}

fn default_background_delay() -> u64 {
  1
}

fn default_refresh_interval() -> u64 {
  30 * 60
}

fn default_notification() -> u64 {
  3
}

fn default_debounce() -> u64 {
  300
}

/// Media host used by `vitrine upload`
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
  #[serde(default = "default_media_api")]
  pub api_base: String,
  pub cloud_name: String,
  /// Unsigned upload preset configured on the media host
  pub upload_preset: String,
}

fn default_media_api() -> String {
  "https://api.cloudinary.com".to_string()
}

/// Build workflow that regenerates the product feed
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
  #[serde(default = "default_workflow_api")]
  pub api_base: String,
  #[serde(default)]
  pub owner: String,
  #[serde(default)]
  pub repo: String,
  #[serde(default)]
  pub workflow: String,
  #[serde(default = "default_branch")]
  pub branch: String,
  #[serde(default = "default_publish_delay")]
  pub delay_secs: u32,
  /// Server-side endpoint that holds the credential and dispatches for us.
  /// When set, no token is read or sent.
  pub proxy_url: Option<String>,
}

fn default_workflow_api() -> String {
  "https://api.github.com".to_string()
}

fn default_branch() -> String {
  "main".to_string()
}

fn default_publish_delay() -> u32 {
  20
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactConfig {
  /// WhatsApp number in international format without '+'
  pub whatsapp_phone: String,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./vitrine.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/vitrine/config.yaml
  /// 4. ~/.config/vitrine/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/vitrine/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("vitrine.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("vitrine").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Header / page title, falling back to the feed host.
  pub fn display_title(&self) -> String {
    match &self.title {
      Some(title) => title.clone(),
      None => crate::ui::renderfns::extract_domain(&self.feed.url).to_string(),
    }
  }

  pub fn default_sort(&self) -> SortKey {
    self
      .default_sort
      .as_deref()
      .map(SortKey::parse)
      .unwrap_or_default()
  }

  /// Get the workflow dispatch token from environment variables.
  ///
  /// Checks VITRINE_WORKFLOW_TOKEN first, then GITHUB_TOKEN as fallback.
  pub fn get_workflow_token() -> Result<SecretString> {
    std::env::var("VITRINE_WORKFLOW_TOKEN")
      .or_else(|_| std::env::var("GITHUB_TOKEN"))
      .map(SecretString::from)
      .map_err(|_| {
        eyre!(
          "Workflow token not found. Set VITRINE_WORKFLOW_TOKEN or GITHUB_TOKEN, \
           or configure workflow.proxy_url."
        )
      })
  }
}

/// Directory holding the cache database and log file.
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("vitrine"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("feed:\n  url: https://shop.example.com/products.json\n").unwrap();

    assert_eq!(config.feed.timeout_secs, 30);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.ttl_secs, 3600);
    assert_eq!(config.refresh.max_retries, 3);
    assert_eq!(config.refresh.retry_delay_secs, 5);
    assert_eq!(config.refresh.background_delay_secs, 1);
    assert_eq!(config.refresh.interval_secs, 1800);
    assert_eq!(config.refresh.notification_secs, 3);
    assert_eq!(config.refresh.search_debounce(), Duration::from_millis(300));
    assert!(config.media.is_none());
    assert_eq!(config.default_sort(), SortKey::Featured);
  }

  #[test]
  fn test_title_falls_back_to_feed_host() {
    let config = Config::from_yaml("feed:\n  url: https://shop.example.com/products.json\n").unwrap();
    assert_eq!(config.display_title(), "shop.example.com");
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
title: JOH Technologies
default_sort: price-desc
feed:
  url: https://shop.example.com/products.json
  timeout_secs: 10
cache:
  enabled: false
refresh:
  max_retries: 5
media:
  cloud_name: demo
  upload_preset: storefront
workflow:
  owner: shop
  repo: gallery
  workflow: update-products.yml
  proxy_url: https://hooks.example.com/publish
contact:
  whatsapp_phone: "256700000000"
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.display_title(), "JOH Technologies");
    assert_eq!(config.default_sort(), SortKey::PriceDesc);
    assert_eq!(config.feed.timeout_secs, 10);
    assert!(!config.cache.enabled);
    assert_eq!(config.refresh.max_retries, 5);
    assert_eq!(config.refresh.retry_delay_secs, 5);

    let media = config.media.unwrap();
    assert_eq!(media.api_base, "https://api.cloudinary.com");

    let workflow = config.workflow.unwrap();
    assert_eq!(workflow.branch, "main");
    assert_eq!(workflow.delay_secs, 20);
    assert_eq!(
      workflow.proxy_url.as_deref(),
      Some("https://hooks.example.com/publish")
    );
  }

  #[test]
  fn test_unknown_sort_falls_back_to_featured() {
    let config =
      Config::from_yaml("default_sort: cheapest\nfeed:\n  url: https://a.example/p.json\n").unwrap();
    assert_eq!(config.default_sort(), SortKey::Featured);
  }
}
