//! Offline entry cache
//!
//! Catalogue entries are kept as one JSON object keyed by id under
//! `dex.entries`, next to the collection payload. Like the collection
//! store, the cache never fails its callers: unreadable payloads read as
//! empty and write failures are logged.

use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{Entry, EntryId};
use crate::source::{EntrySource, Page};
use crate::storage::KeyValueStore;

/// Key the cached entries are stored under
pub const ENTRIES_KEY: &str = "dex.entries";

/// Entry cache over a key-value store
pub struct EntryCache<K> {
    kv: K,
}

impl<K: KeyValueStore> EntryCache<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn get(&self, id: EntryId) -> Option<Entry> {
        let entry = self.load().remove(&id);
        if entry.is_none() {
            debug!("Entry {} not in cache", id);
        }
        entry
    }

    /// Cached entries for `ids`, in the order asked; misses are skipped
    pub fn get_many(&self, ids: &[EntryId]) -> Vec<Entry> {
        let entries = self.load();
        ids.iter().filter_map(|id| entries.get(id).cloned()).collect()
    }

    /// Every cached entry keyed by id, from a single read
    ///
    /// Prefer this over repeated `get` calls: each call decodes the whole
    /// cache payload.
    pub fn index(&self) -> BTreeMap<EntryId, Entry> {
        self.load()
    }

    pub fn put(&self, entry: Entry) {
        self.put_many(vec![entry]);
    }

    /// Insert or replace entries with a single write
    pub fn put_many(&self, new_entries: Vec<Entry>) {
        if new_entries.is_empty() {
            return;
        }

        let mut entries = self.load();
        for entry in new_entries {
            entries.insert(entry.id, entry);
        }
        self.save(&entries);
    }

    /// Every cached entry, by ascending id
    pub fn all(&self) -> Vec<Entry> {
        self.load().into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        if let Err(e) = self.kv.remove(ENTRIES_KEY) {
            warn!("Failed to clear entry cache: {}", e);
        }
    }

    fn load(&self) -> BTreeMap<EntryId, Entry> {
        let raw = match self.kv.get(ENTRIES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read entry cache: {}", e);
                return BTreeMap::new();
            }
        };
        decode_entries(&raw)
    }

    fn save(&self, entries: &BTreeMap<EntryId, Entry>) {
        let keyed: BTreeMap<String, &Entry> =
            entries.iter().map(|(id, e)| (id.to_string(), e)).collect();

        let result = serde_json::to_string(&keyed)
            .map_err(Into::into)
            .and_then(|json| self.kv.set(ENTRIES_KEY, &json));

        match result {
            Ok(()) => debug!("Cached {} entries", entries.len()),
            Err(e) => warn!("Failed to write entry cache: {}", e),
        }
    }
}

/// Decode the cache payload, dropping records that are not valid entries
fn decode_entries(raw: &str) -> BTreeMap<EntryId, Entry> {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) else {
        debug!("Ignoring malformed entry cache payload");
        return BTreeMap::new();
    };

    map.into_iter()
        .filter_map(|(_, value)| serde_json::from_value::<Entry>(value).ok())
        .map(|entry| (entry.id, entry))
        .collect()
}

impl<K: KeyValueStore> EntrySource for EntryCache<K> {
    fn fetch_page(&self, limit: usize, offset: usize) -> Result<Page> {
        Ok(Page::slice(&self.all(), limit, offset))
    }

    fn fetch_by_id(&self, id: EntryId) -> Result<Option<Entry>> {
        Ok(self.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKv;
    use std::rc::Rc;

    fn sample() -> Vec<Entry> {
        vec![
            Entry::new(4, "charmander").with_types(["fire"]),
            Entry::new(1, "bulbasaur").with_types(["grass", "poison"]),
            Entry::new(25, "pikachu").with_types(["electric"]),
        ]
    }

    #[test]
    fn test_put_and_get() {
        let cache = EntryCache::new(MemoryKv::new());
        assert!(cache.is_empty());

        cache.put_many(sample());

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(1).unwrap().name, "bulbasaur");
        assert!(cache.get(2).is_none());
    }

    #[test]
    fn test_put_replaces() {
        let cache = EntryCache::new(MemoryKv::new());
        cache.put(Entry::new(1, "bulbasaur"));
        cache.put(Entry::new(1, "bulbasaur").with_measurements(Some(7), Some(69)));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(1).unwrap().weight, Some(69));
    }

    #[test]
    fn test_get_many_keeps_requested_order() {
        let cache = EntryCache::new(MemoryKv::new());
        cache.put_many(sample());

        let names: Vec<_> = cache
            .get_many(&[25, 3, 1])
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["pikachu", "bulbasaur"]);
    }

    #[test]
    fn test_lookups_read_the_payload_once() {
        let kv = Rc::new(MemoryKv::new());
        let cache = EntryCache::new(Rc::clone(&kv));
        cache.put_many(sample());

        let before = kv.read_count();
        let index = cache.index();
        assert_eq!(kv.read_count(), before + 1);
        assert_eq!(index.len(), 3);
        assert_eq!(index[&25].name, "pikachu");

        let ids: Vec<EntryId> = (1..=500).collect();
        let before = kv.read_count();
        assert_eq!(cache.get_many(&ids).len(), 3);
        assert_eq!(kv.read_count(), before + 1);
    }

    #[test]
    fn test_all_sorted_by_id() {
        let cache = EntryCache::new(MemoryKv::new());
        cache.put_many(sample());

        let ids: Vec<_> = cache.all().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 4, 25]);
    }

    #[test]
    fn test_put_many_single_write() {
        let kv = Rc::new(MemoryKv::new());
        let cache = EntryCache::new(Rc::clone(&kv));

        cache.put_many(Vec::new());
        assert_eq!(kv.write_count(), 0);

        cache.put_many(sample());
        assert_eq!(kv.write_count(), 1);
    }

    #[test]
    fn test_invalid_records_dropped() {
        let kv = MemoryKv::new();
        kv.set(
            ENTRIES_KEY,
            r#"{"1":{"id":1,"name":"bulbasaur","types":["grass"]},
                "2":{"name":"no id"},
                "3":{"id":3,"name":7},
                "4":{"id":4,"name":"x","types":"fire"}}"#,
        )
        .unwrap();
        let cache = EntryCache::new(kv);

        assert_eq!(cache.len(), 1);
        assert!(cache.get(1).is_some());
    }

    #[test]
    fn test_garbled_payload_reads_empty() {
        let kv = MemoryKv::new();
        kv.set(ENTRIES_KEY, "[1,2,3]").unwrap();
        let cache = EntryCache::new(kv);

        assert!(cache.all().is_empty());
    }

    #[test]
    fn test_failing_store_is_swallowed() {
        let cache = EntryCache::new(MemoryKv::failing());
        cache.put_many(sample());
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn test_entry_source_pages() {
        let cache = EntryCache::new(MemoryKv::new());
        cache.put_many(sample());

        let page = cache.fetch_page(2, 1).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items[0].id, 4);
        assert_eq!(page.items[1].id, 25);

        assert_eq!(cache.fetch_by_id(25).unwrap().unwrap().name, "pikachu");
    }
}
