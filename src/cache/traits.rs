//! Core types for the caching system.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Bumped whenever the stored payload shape changes. Entries written with a
/// different version are treated as a miss instead of being half-decoded.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// A cached payload with the time it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub version: u32,
  /// Fetch time in milliseconds since the Unix epoch
  pub timestamp: i64,
  /// Items in feed order
  pub payload: Vec<T>,
  /// Fetch time as RFC 3339, for display
  pub load_time: String,
  /// SHA-256 of the serialized payload
  pub digest: String,
}

impl<T> CacheEntry<T> {
  /// When the payload was fetched.
  pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(self.timestamp).single()
  }
}

/// Borrowed form of `CacheEntry` used when writing, so saving does not
/// clone the payload.
#[derive(Serialize)]
pub(super) struct CacheEntryRef<'a, T> {
  pub version: u32,
  pub timestamp: i64,
  pub payload: &'a [T],
  pub load_time: String,
  pub digest: String,
}

/// Hex SHA-256 of a payload's JSON form.
pub fn payload_digest<T: Serialize>(payload: &[T]) -> serde_json::Result<String> {
  let bytes = serde_json::to_vec(payload)?;
  let mut hasher = Sha256::new();
  hasher.update(&bytes);
  Ok(hex::encode(hasher.finalize()))
}

/// Where the currently displayed data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Served from the local cache, still within its TTL
  Cache,
}
