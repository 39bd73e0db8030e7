//! Local persistent cache for the product feed.
//!
//! One slot holds the last successfully fetched list together with its
//! fetch time. Entries older than the TTL are misses; nothing is ever
//! swept or deleted, a newer save simply overwrites the slot.

mod layer;
mod storage;
mod traits;

pub use layer::{CacheStore, PRODUCTS_CACHE_KEY};
pub use storage::{CacheStorage, NoopStorage, SqliteStorage};
pub use traits::{CacheEntry, CacheSource};
