//! Product catalog: feed types, fetching, and the display projection.

pub mod api_types;
pub mod card;
pub mod client;
pub mod export;
pub mod format;
pub mod stats;
pub mod types;
pub mod view;
