//! Collection store
//!
//! The `CollectionStore` owns the in-memory collection (owned entries with
//! their timestamps, plus notes) and writes the whole state back to its
//! `PersistenceSlot` after every mutation.
//!
//! Persistence is best-effort: read and write failures are logged and
//! swallowed, and the in-memory state stays authoritative for the session.
//!
//! ## Usage
//!
//! ```ignore
//! let slot = CollectionSlot::new(SqliteKv::open(&config.sqlite_path())?);
//! let mut store = CollectionStore::open(slot);
//!
//! store.mark_owned(1, None);
//! store.set_note(1, "First catch");
//!
//! let rows = store.owned_rows(&entries);
//! ```

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::models::{CollectionRow, Entry, EntryId, OwnershipRecord, PersistedState, Progress};
use crate::storage::PersistenceSlot;

/// In-memory collection
///
/// Owned ids are kept in the order they were first marked, each paired with
/// its timestamp, so every owned id has exactly one timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionState {
    owned: Vec<(EntryId, String)>,
    notes: BTreeMap<EntryId, String>,
}

impl CollectionState {
    /// Build state from its persisted form
    ///
    /// Note keys that do not parse as integers are skipped. A repeated
    /// `entryId` keeps its first position and its last timestamp.
    pub fn from_persisted(persisted: &PersistedState) -> Self {
        let mut state = Self::default();
        for record in &persisted.owned {
            state.insert_owned(record.entry_id, record.owned_at.clone());
        }

        state.notes = persisted
            .notes
            .iter()
            .flatten()
            .filter_map(|(key, text)| key.trim().parse::<EntryId>().ok().map(|id| (id, text.clone())))
            .collect();

        state
    }

    fn position(&self, id: EntryId) -> Option<usize> {
        self.owned.iter().position(|(owned, _)| *owned == id)
    }

    /// Add `id` at the end, or update its timestamp in place
    fn insert_owned(&mut self, id: EntryId, at: String) {
        match self.position(id) {
            Some(idx) => self.owned[idx].1 = at,
            None => self.owned.push((id, at)),
        }
    }

    fn remove_owned(&mut self, id: EntryId) {
        self.owned.retain(|(owned, _)| *owned != id);
    }

    /// Serialized form; empty notes are left out
    pub fn to_persisted(&self) -> PersistedState {
        let owned = self
            .owned
            .iter()
            .map(|(id, at)| OwnershipRecord {
                entry_id: *id,
                owned_at: at.clone(),
            })
            .collect();

        let notes: BTreeMap<String, String> = self
            .notes
            .iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(id, text)| (id.to_string(), text.clone()))
            .collect();

        PersistedState {
            owned,
            notes: if notes.is_empty() { None } else { Some(notes) },
        }
    }
}

/// The user's collection, kept in sync with persistent storage
pub struct CollectionStore<P> {
    state: CollectionState,
    slot: P,
}

impl<P: PersistenceSlot> CollectionStore<P> {
    /// Create an empty store without reading storage
    pub fn new(slot: P) -> Self {
        Self {
            state: CollectionState::default(),
            slot,
        }
    }

    /// Create a store and hydrate it from storage
    pub fn open(slot: P) -> Self {
        let mut store = Self::new(slot);
        store.hydrate();
        store
    }

    /// Replace in-memory state with what storage holds
    ///
    /// Leaves the current state untouched when storage is empty, unreadable
    /// or holds a malformed payload. Returns whether state was replaced.
    pub fn hydrate(&mut self) -> bool {
        match self.slot.read() {
            Ok(Some(persisted)) => {
                self.state = CollectionState::from_persisted(&persisted);
                debug!(
                    "Hydrated collection: {} owned, {} notes",
                    self.state.owned.len(),
                    self.state.notes.len()
                );
                true
            }
            Ok(None) => {
                debug!("No stored collection to hydrate");
                false
            }
            Err(e) => {
                warn!("Failed to read stored collection: {}", e);
                false
            }
        }
    }

    /// Mark `id` as owned at `at`, or now
    ///
    /// Marking an owned id again replaces its timestamp and keeps its
    /// position.
    pub fn mark_owned(&mut self, id: EntryId, at: Option<String>) {
        let at = at.unwrap_or_else(now_timestamp);
        self.state.insert_owned(id, at);
        self.persist();
    }

    /// Remove `id` from the collection along with its note
    pub fn release(&mut self, id: EntryId) {
        self.remove_one(id);
        self.persist();
    }

    /// Release several ids with a single write
    pub fn release_many(&mut self, ids: &[EntryId]) {
        for id in ids {
            self.remove_one(*id);
        }
        self.persist();
    }

    fn remove_one(&mut self, id: EntryId) {
        self.state.remove_owned(id);
        self.state.notes.remove(&id);
    }

    /// Set the note for `id`, owned or not
    pub fn set_note(&mut self, id: EntryId, text: impl Into<String>) {
        self.state.notes.insert(id, text.into());
        self.persist();
    }

    /// Note for `id`, or an empty string
    pub fn get_note(&self, id: EntryId) -> String {
        self.state.notes.get(&id).cloned().unwrap_or_default()
    }

    pub fn is_owned(&self, id: EntryId) -> bool {
        self.state.position(id).is_some()
    }

    pub fn owned_at(&self, id: EntryId) -> Option<&str> {
        self.state
            .position(id)
            .map(|idx| self.state.owned[idx].1.as_str())
    }

    /// Owned ids in ascending order
    pub fn owned_ids(&self) -> Vec<EntryId> {
        let mut ids: Vec<EntryId> = self.state.owned.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids
    }

    pub fn owned_count(&self) -> usize {
        self.state.owned.len()
    }

    /// Non-empty notes by entry id
    pub fn notes(&self) -> impl Iterator<Item = (EntryId, &str)> {
        self.state
            .notes
            .iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(id, text)| (*id, text.as_str()))
    }

    pub fn state(&self) -> &CollectionState {
        &self.state
    }

    pub fn to_persisted(&self) -> PersistedState {
        self.state.to_persisted()
    }

    /// Decorate `entries` with ownership and notes
    pub fn rows(&self, entries: &[Entry]) -> Vec<CollectionRow> {
        entries.iter().map(|entry| self.row(entry)).collect()
    }

    /// Decorate `entries`, keeping only the owned ones
    pub fn owned_rows(&self, entries: &[Entry]) -> Vec<CollectionRow> {
        entries
            .iter()
            .filter(|entry| self.is_owned(entry.id))
            .map(|entry| self.row(entry))
            .collect()
    }

    fn row(&self, entry: &Entry) -> CollectionRow {
        let mut row = CollectionRow::from_entry(entry);
        row.owned_at = self.owned_at(entry.id).map(str::to_string);
        row.note = self
            .state
            .notes
            .get(&entry.id)
            .filter(|text| !text.is_empty())
            .cloned();
        row
    }

    /// Owned count against a catalogue of `total` entries
    pub fn progress(&self, total: usize) -> Progress {
        Progress::new(self.owned_count(), total)
    }

    fn persist(&self) {
        if let Err(e) = self.slot.write(&self.state.to_persisted()) {
            match e.recovery_suggestion() {
                Some(hint) if e.is_recoverable() => {
                    warn!("Failed to persist collection: {}. {}", e, hint)
                }
                _ => warn!("Failed to persist collection: {}", e),
            }
        }
    }
}

/// Current UTC time as `2025-02-01T12:00:00.000Z`
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
