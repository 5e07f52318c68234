//! Repository adapters for StylePitch.
//!
//! `MemoryStore` backs tests and local runs; `SqliteStore` (feature
//! `db-sqlite`) is the durable store.

pub mod error;
pub mod memory;
pub mod paths;
#[cfg(feature = "db-sqlite")]
pub mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
#[cfg(feature = "db-sqlite")]
pub use sqlite::SqliteStore;
