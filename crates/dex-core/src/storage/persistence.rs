//! Collection state persistence
//!
//! The collection is written as one JSON payload under a fixed key of a
//! `KeyValueStore`:
//!
//! ```text
//! {"owned":[{"entryId":1,"ownedAt":"2025-02-01T12:00:00.000Z"}],"notes":{"1":"First catch"}}
//! ```
//!
//! Payloads of the wrong shape read as absent. Also provides the atomic
//! file write used for exports.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{OwnershipRecord, PersistedState};
use crate::storage::error::StorageResult;
use crate::storage::kv::KeyValueStore;

/// Key the collection payload is stored under
pub const COLLECTION_KEY: &str = "dex.collection";

/// Where the collection store reads and writes its state
pub trait PersistenceSlot {
    /// Load the saved state; `Ok(None)` when nothing valid is stored
    fn read(&self) -> StorageResult<Option<PersistedState>>;

    /// Replace the saved state
    fn write(&self, state: &PersistedState) -> StorageResult<()>;
}

/// `PersistenceSlot` over a key-value store
pub struct CollectionSlot<K> {
    kv: K,
    key: String,
}

impl<K: KeyValueStore> CollectionSlot<K> {
    /// Use the default collection key
    pub fn new(kv: K) -> Self {
        Self::with_key(kv, COLLECTION_KEY)
    }

    pub fn with_key(kv: K, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying store
    pub fn kv(&self) -> &K {
        &self.kv
    }
}

impl<K: KeyValueStore> PersistenceSlot for CollectionSlot<K> {
    fn read(&self) -> StorageResult<Option<PersistedState>> {
        let Some(raw) = self.kv.get(&self.key)? else {
            return Ok(None);
        };
        let state = decode_state(&raw);
        if state.is_none() {
            debug!("Ignoring malformed collection payload under {}", self.key);
        }
        Ok(state)
    }

    fn write(&self, state: &PersistedState) -> StorageResult<()> {
        let json = serde_json::to_string(state)?;
        self.kv.set(&self.key, &json)
    }
}

/// Stored shape before note validation
#[derive(Deserialize)]
struct RawState {
    #[serde(alias = "caught")]
    owned: Vec<OwnershipRecord>,
    #[serde(default)]
    notes: Option<serde_json::Map<String, Value>>,
}

/// Decode and validate a stored payload
///
/// `owned` must be a list of `{entryId: integer, ownedAt: string}` records
/// and `notes`, when present, an object; anything else is rejected whole.
/// Inside `notes`, keys that are not integers and values that are not
/// strings are dropped.
pub fn decode_state(raw: &str) -> Option<PersistedState> {
    let parsed: RawState = serde_json::from_str(raw).ok()?;

    let notes = parsed.notes.map(|map| {
        map.into_iter()
            .filter(|(key, _)| key.trim().parse::<i64>().is_ok())
            .filter_map(|(key, value)| match value {
                Value::String(text) => Some((key, text)),
                _ => None,
            })
            .collect::<BTreeMap<_, _>>()
    });

    Some(PersistedState {
        owned: parsed.owned,
        notes,
    })
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file {:?}", temp_path))?;

    file.write_all(data)
        .with_context(|| format!("Failed to write to temp file {:?}", temp_path))?;

    file.sync_all()
        .with_context(|| format!("Failed to sync temp file {:?}", temp_path))?;

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    Ok(())
}
