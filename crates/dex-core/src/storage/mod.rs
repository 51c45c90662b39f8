//! Storage layer
//!
//! Handles persistence of the collection and the entry cache.
//!
//! ## Architecture
//!
//! - **KeyValueStore**: text payloads under fixed key names, backed by
//!   SQLite on disk or a map in memory
//! - **CollectionSlot**: the collection payload, validated on read
//!
//! Writes are best-effort from the caller's point of view: the collection
//! store and entry cache log failures and carry on with in-memory state.

pub mod error;
pub mod kv;
pub mod persistence;
pub mod schema;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use kv::{KeyValueStore, MemoryKv, DEFAULT_QUOTA};
pub use persistence::{atomic_write, CollectionSlot, PersistenceSlot, COLLECTION_KEY};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::{KvStats, SqliteKv};
