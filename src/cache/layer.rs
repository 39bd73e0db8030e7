//! TTL-bounded cache slot on top of a storage backend.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::CacheStorage;
use super::traits::{payload_digest, CacheEntry, CacheEntryRef, CACHE_FORMAT_VERSION};

/// Slot the product list is stored under.
pub const PRODUCTS_CACHE_KEY: &str = "vitrine_products_cache";

/// A single cache slot holding a list of `T` with a time-to-live.
///
/// Storage and decode failures never propagate: they are logged and
/// reported as a miss (on load) or a skipped write (on save).
pub struct CacheStore<T> {
  storage: Arc<dyn CacheStorage>,
  key: String,
  ttl: Duration,
  _item: PhantomData<fn() -> T>,
}

impl<T> CacheStore<T>
where
  T: Serialize + DeserializeOwned,
{
  pub fn new(storage: Arc<dyn CacheStorage>, key: impl Into<String>, ttl: Duration) -> Self {
    Self {
      storage,
      key: key.into(),
      ttl,
      _item: PhantomData,
    }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Load the entry if it is younger than the TTL.
  pub fn load(&self) -> Option<CacheEntry<T>> {
    self.load_at(Utc::now())
  }

  pub fn load_at(&self, now: DateTime<Utc>) -> Option<CacheEntry<T>> {
    let raw = match self.storage.read_slot(&self.key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        warn!(key = %self.key, error = %e, "Cache read failed");
        return None;
      }
    };

    let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(key = %self.key, error = %e, "Cache entry is corrupt");
        return None;
      }
    };

    if entry.version != CACHE_FORMAT_VERSION {
      debug!(
        key = %self.key,
        version = entry.version,
        "Ignoring cache entry from another format version"
      );
      return None;
    }

    match payload_digest(&entry.payload) {
      Ok(digest) if digest == entry.digest => {}
      Ok(_) => {
        warn!(key = %self.key, "Cache entry digest mismatch");
        return None;
      }
      Err(e) => {
        warn!(key = %self.key, error = %e, "Failed to digest cached payload");
        return None;
      }
    }

    let age = now.timestamp_millis() - entry.timestamp;
    if age >= self.ttl.num_milliseconds() {
      debug!(key = %self.key, age_ms = age, "Cache entry expired");
      return None;
    }

    Some(entry)
  }

  /// Persist `payload` stamped with the current time. Returns whether the
  /// write happened.
  pub fn save(&self, payload: &[T]) -> bool {
    self.save_at(payload, Utc::now())
  }

  pub fn save_at(&self, payload: &[T], now: DateTime<Utc>) -> bool {
    let digest = match payload_digest(payload) {
      Ok(digest) => digest,
      Err(e) => {
        warn!(key = %self.key, error = %e, "Failed to serialize cache payload");
        return false;
      }
    };

    let entry = CacheEntryRef {
      version: CACHE_FORMAT_VERSION,
      timestamp: now.timestamp_millis(),
      payload,
      load_time: now.to_rfc3339(),
      digest,
    };

    let raw = match serde_json::to_string(&entry) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(key = %self.key, error = %e, "Failed to serialize cache entry");
        return false;
      }
    };

    if let Err(e) = self.storage.write_slot(&self.key, &raw) {
      warn!(key = %self.key, error = %e, "Cache write failed");
      return false;
    }

    debug!(key = %self.key, items = payload.len(), "Saved cache entry");
    true
  }
}

impl<T> Clone for CacheStore<T> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      key: self.key.clone(),
      ttl: self.ttl,
      _item: PhantomData,
    }
  }
}
