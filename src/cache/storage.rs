//! Cache storage trait and SQLite implementation.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Key-value slot storage backing the cache.
pub trait CacheStorage: Send + Sync {
  /// Read the raw value stored under `slot`.
  fn read_slot(&self, slot: &str) -> Result<Option<String>>;

  /// Overwrite the value stored under `slot`.
  fn write_slot(&self, slot: &str, value: &str) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn read_slot(&self, _slot: &str) -> Result<Option<String>> {
    Ok(None) // Always miss
  }

  fn write_slot(&self, _slot: &str, _value: &str) -> Result<()> {
    Ok(()) // Discard
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the cache database at the default location.
  pub fn open() -> Result<Self> {
    let path = crate::config::data_dir()?.join("cache.db");
    Self::open_at(&path)
  }

  /// Open or create a cache database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Private in-memory database, used by tests.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- One row per named cache slot (stores serialized JSON)
CREATE TABLE IF NOT EXISTS cache_slots (
    slot TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl CacheStorage for SqliteStorage {
  fn read_slot(&self, slot: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM cache_slots WHERE slot = ?",
        params![slot],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache slot {}: {}", slot, e))
  }

  fn write_slot(&self, slot: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache_slots (slot, value, written_at)
         VALUES (?, ?, datetime('now'))",
        params![slot, value],
      )
      .map_err(|e| eyre!("Failed to write cache slot {}: {}", slot, e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sqlite_slot_round_trip() {
    let storage = SqliteStorage::open_in_memory().unwrap();

    assert_eq!(storage.read_slot("products").unwrap(), None);

    storage.write_slot("products", "[1]").unwrap();
    storage.write_slot("products", "[1,2]").unwrap();
    assert_eq!(
      storage.read_slot("products").unwrap().as_deref(),
      Some("[1,2]")
    );
    assert_eq!(storage.read_slot("other").unwrap(), None);
  }

  #[test]
  fn test_noop_storage_always_misses() {
    let storage = NoopStorage;
    storage.write_slot("products", "[]").unwrap();
    assert_eq!(storage.read_slot("products").unwrap(), None);
  }
}
