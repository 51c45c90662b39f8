//! Dex Core Library
//!
//! This crate provides the core functionality for dex, a personal
//! collection tracker over a catalogue of entries: which ones you own,
//! when you got them, and notes about each.
//!
//! # Architecture
//!
//! - **CollectionStore**: in-memory source of truth, written back to a
//!   key-value store after every change
//! - **Filter pipeline**: pure functions over entry lists
//! - **Export**: CSV rendering of owned rows
//!
//! # Quick Start
//!
//! ```text
//! let kv = Rc::new(SqliteKv::open(&config.sqlite_path())?);
//! let mut store = CollectionStore::open(CollectionSlot::new(Rc::clone(&kv)));
//! let cache = EntryCache::new(kv);
//!
//! store.mark_owned(1, None);
//! let rows = store.owned_rows(&cache.all());
//! let csv = build_export(&rows);
//! ```
//!
//! # Modules
//!
//! - `store`: Collection store (main entry point)
//! - `models`: Entries, ownership records and persisted state
//! - `filters`: Filter and sort pipeline
//! - `export`: CSV export
//! - `cache`: Offline entry cache
//! - `source`: Entry sources and catalogue files
//! - `storage`: Key-value persistence
//! - `config`: Application configuration

pub mod cache;
pub mod config;
pub mod export;
pub mod filters;
pub mod models;
pub mod source;
pub mod storage;
pub mod store;

pub use cache::{EntryCache, ENTRIES_KEY};
pub use config::Config;
pub use export::{build_export, export_filename};
pub use filters::{CollectionQuery, Filterable, RangeFilter, SortDirection, SortKey, SortOption};
pub use models::{CollectionRow, Entry, EntryId, OwnershipRecord, PersistedState, Progress};
pub use source::{EntrySource, JsonCatalogue, Page};
pub use storage::{
    CollectionSlot, KeyValueStore, MemoryKv, PersistenceSlot, SqliteKv, StorageError,
    COLLECTION_KEY,
};
pub use store::{CollectionState, CollectionStore};
