//! Data models for dex
//!
//! Defines the catalogue `Entry`, the ownership records kept by the
//! collection store, and the persisted shape written to storage.
//! Heights and weights are kept in the catalogue's raw units: tenths of a
//! metre and tenths of a kilogram.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier of a catalogue entry
pub type EntryId = i64;

/// A catalogue entry as supplied by the entry source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Catalogue identifier
    pub id: EntryId,
    /// Display name
    pub name: String,
    /// Artwork URL, when the source has one
    #[serde(default)]
    pub image_url: Option<String>,
    /// Types in catalogue order
    #[serde(default)]
    pub types: Vec<String>,
    /// Height in tenths of a metre
    #[serde(default)]
    pub height: Option<i64>,
    /// Weight in tenths of a kilogram
    #[serde(default)]
    pub weight: Option<i64>,
}

impl Entry {
    /// Create an entry with just an id and a name
    pub fn new(id: EntryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            image_url: None,
            types: Vec::new(),
            height: None,
            weight: None,
        }
    }

    /// Builder-style setter for the types
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style setter for height and weight (raw units)
    pub fn with_measurements(mut self, height: Option<i64>, weight: Option<i64>) -> Self {
        self.height = height;
        self.weight = weight;
        self
    }

    /// Height in metres, for display
    pub fn height_metres(&self) -> Option<f64> {
        self.height.map(|h| h as f64 / 10.0)
    }

    /// Weight in kilograms, for display
    pub fn weight_kg(&self) -> Option<f64> {
        self.weight.map(|w| w as f64 / 10.0)
    }
}

/// One owned entry as written to storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipRecord {
    /// The owned entry
    #[serde(alias = "pokemonId")]
    pub entry_id: EntryId,
    /// ISO-8601 timestamp of when the entry was marked owned
    #[serde(alias = "caughtAt")]
    pub owned_at: String,
}

/// Serialized collection state
///
/// Notes are keyed by the stringified entry id since JSON object keys are
/// always strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedState {
    #[serde(alias = "caught")]
    pub owned: Vec<OwnershipRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<BTreeMap<String, String>>,
}

/// An entry decorated with collection metadata
///
/// This is what list views render and what the CSV export consumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRow {
    pub id: EntryId,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub weight: Option<i64>,
    /// When the entry was marked owned; `None` when not owned
    #[serde(default, alias = "caughtAt")]
    pub owned_at: Option<String>,
    /// Free-text note, if one exists
    #[serde(default)]
    pub note: Option<String>,
}

impl CollectionRow {
    /// Wrap an entry with no collection metadata
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            name: entry.name.clone(),
            image_url: entry.image_url.clone(),
            types: entry.types.clone(),
            height: entry.height,
            weight: entry.weight,
            owned_at: None,
            note: None,
        }
    }

    /// Whether the row belongs to the collection
    pub fn is_owned(&self) -> bool {
        self.owned_at.is_some()
    }
}

/// How far the collection is through the catalogue
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Progress {
    pub owned: usize,
    pub total: usize,
    /// Share of the catalogue owned, clamped to `0..=100`
    pub percent: f64,
}

impl Progress {
    pub fn new(owned: usize, total: usize) -> Self {
        let percent = if total > 0 {
            (owned as f64 / total as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        Self {
            owned,
            total,
            percent,
        }
    }

    /// Percentage rounded for display
    pub fn rounded_percent(&self) -> u32 {
        self.percent.round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builder() {
        let entry = Entry::new(1, "bulbasaur")
            .with_types(["grass", "poison"])
            .with_measurements(Some(7), Some(69));

        assert_eq!(entry.types, vec!["grass", "poison"]);
        assert_eq!(entry.height, Some(7));
        assert_eq!(entry.height_metres(), Some(0.7));
        assert_eq!(entry.weight_kg(), Some(6.9));
    }

    #[test]
    fn test_entry_deserialize_camel_case() {
        let json = r#"{"id":25,"name":"pikachu","imageUrl":"https://img/25.png","types":["electric"],"height":4}"#;
        let entry: Entry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.id, 25);
        assert_eq!(entry.image_url.as_deref(), Some("https://img/25.png"));
        assert_eq!(entry.height, Some(4));
        assert!(entry.weight.is_none());
    }

    #[test]
    fn test_entry_optional_fields_default() {
        let entry: Entry = serde_json::from_str(r#"{"id":3,"name":"venusaur"}"#).unwrap();
        assert!(entry.types.is_empty());
        assert!(entry.image_url.is_none());
    }

    #[test]
    fn test_persisted_state_wire_shape() {
        let state = PersistedState {
            owned: vec![OwnershipRecord {
                entry_id: 1,
                owned_at: "2025-02-01T12:00:00Z".to_string(),
            }],
            notes: None,
        };

        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(
            json,
            r#"{"owned":[{"entryId":1,"ownedAt":"2025-02-01T12:00:00Z"}]}"#
        );
    }

    #[test]
    fn test_persisted_state_accepts_legacy_shape() {
        let json = r#"{"caught":[{"pokemonId":4,"caughtAt":"2025-01-01T00:00:00Z"}]}"#;
        let state: PersistedState = serde_json::from_str(json).unwrap();

        assert_eq!(state.owned.len(), 1);
        assert_eq!(state.owned[0].entry_id, 4);
        assert!(state.notes.is_none());
    }

    #[test]
    fn test_row_from_entry() {
        let entry = Entry::new(6, "charizard").with_types(["fire", "flying"]);
        let row = CollectionRow::from_entry(&entry);

        assert_eq!(row.id, 6);
        assert_eq!(row.types, entry.types);
        assert!(!row.is_owned());
        assert!(row.note.is_none());
    }

    #[test]
    fn test_progress() {
        let progress = Progress::new(3, 151);
        assert_eq!(progress.rounded_percent(), 2);

        assert_eq!(Progress::new(5, 0).percent, 0.0);
        assert_eq!(Progress::new(200, 151).percent, 100.0);
    }
}
