//! Entry sources
//!
//! An `EntrySource` hands out catalogue entries a page at a time. The CLI
//! imports a `JsonCatalogue` file into the `EntryCache` and then browses
//! the cache, which is itself a source.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{Entry, EntryId};

/// One page of entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Entries on this page
    pub items: Vec<Entry>,
    /// Size of the whole catalogue
    pub total: usize,
}

impl Page {
    /// Slice a page out of a complete, ordered list
    pub fn slice(all: &[Entry], limit: usize, offset: usize) -> Self {
        let items = all.iter().skip(offset).take(limit).cloned().collect();
        Self {
            items,
            total: all.len(),
        }
    }

    /// Whether entries remain after this page
    pub fn has_more(&self, offset: usize) -> bool {
        offset.saturating_add(self.items.len()) < self.total
    }
}

/// Something that can list catalogue entries
pub trait EntrySource {
    /// Fetch up to `limit` entries starting at `offset`
    fn fetch_page(&self, limit: usize, offset: usize) -> Result<Page>;

    /// Fetch a single entry
    fn fetch_by_id(&self, id: EntryId) -> Result<Option<Entry>>;
}

/// Catalogue file contents: a bare array or a page object
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogueFile {
    List(Vec<Entry>),
    Paged {
        items: Vec<Entry>,
        #[serde(default)]
        total: Option<usize>,
    },
}

/// A catalogue held in memory, loaded from JSON
#[derive(Debug, Clone, Default)]
pub struct JsonCatalogue {
    entries: Vec<Entry>,
    total: usize,
}

impl JsonCatalogue {
    /// Build from entries already in memory
    pub fn new(mut entries: Vec<Entry>) -> Self {
        entries.sort_by_key(|e| e.id);
        let total = entries.len();
        Self { entries, total }
    }

    /// Load a catalogue file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalogue file: {:?}", path))?;
        Self::from_json(&content).with_context(|| format!("Failed to parse catalogue file: {:?}", path))
    }

    /// Parse catalogue JSON
    ///
    /// A declared `total` smaller than the number of items is ignored.
    pub fn from_json(content: &str) -> Result<Self> {
        let file: CatalogueFile = serde_json::from_str(content).context("Invalid catalogue JSON")?;
        let catalogue = match file {
            CatalogueFile::List(entries) => Self::new(entries),
            CatalogueFile::Paged { items, total } => {
                let mut catalogue = Self::new(items);
                if let Some(total) = total {
                    catalogue.total = total.max(catalogue.entries.len());
                }
                catalogue
            }
        };
        Ok(catalogue)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Declared catalogue size; may exceed the entries held
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EntrySource for JsonCatalogue {
    fn fetch_page(&self, limit: usize, offset: usize) -> Result<Page> {
        let mut page = Page::slice(&self.entries, limit, offset);
        page.total = self.total;
        Ok(page)
    }

    fn fetch_by_id(&self, id: EntryId) -> Result<Option<Entry>> {
        Ok(self
            .entries
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|idx| self.entries[idx].clone()))
    }
}
