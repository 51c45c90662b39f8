//! Filter and sort pipeline
//!
//! Pure functions over slices of catalogue items. Every stage returns a new
//! `Vec` and leaves its input untouched. When all stages run they are
//! applied in a fixed order: name, type, height range, weight range, sort.
//!
//! Range bounds are given in metres and kilograms; items store tenths of
//! those units, so bounds are scaled by ten before comparing.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{CollectionRow, Entry, EntryId};

/// Read access the pipeline needs from an item
pub trait Filterable {
    fn id(&self) -> Option<EntryId>;
    fn name(&self) -> &str;
    fn types(&self) -> &[String];
    fn height(&self) -> Option<i64>;
    fn weight(&self) -> Option<i64>;

    /// Owned-at timestamp, for items decorated with collection metadata
    fn owned_at(&self) -> Option<&str> {
        None
    }
}

impl Filterable for Entry {
    fn id(&self) -> Option<EntryId> {
        Some(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn types(&self) -> &[String] {
        &self.types
    }

    fn height(&self) -> Option<i64> {
        self.height
    }

    fn weight(&self) -> Option<i64> {
        self.weight
    }
}

impl Filterable for CollectionRow {
    fn id(&self) -> Option<EntryId> {
        Some(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn types(&self) -> &[String] {
        &self.types
    }

    fn height(&self) -> Option<i64> {
        self.height
    }

    fn weight(&self) -> Option<i64> {
        self.weight
    }

    fn owned_at(&self) -> Option<&str> {
        self.owned_at.as_deref()
    }
}

/// Keep items whose name contains `query`, ignoring case
///
/// A blank query keeps everything.
pub fn filter_by_name<T: Filterable + Clone>(list: &[T], query: &str) -> Vec<T> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return list.to_vec();
    }
    list.iter()
        .filter(|item| item.name().to_lowercase().contains(&query))
        .cloned()
        .collect()
}

/// Keep items having at least one of `selected` types, ignoring case
///
/// An empty selection keeps everything.
pub fn filter_by_type<T, S>(list: &[T], selected: &[S]) -> Vec<T>
where
    T: Filterable + Clone,
    S: AsRef<str>,
{
    if selected.is_empty() {
        return list.to_vec();
    }
    let wanted: Vec<String> = selected.iter().map(|t| t.as_ref().to_lowercase()).collect();
    list.iter()
        .filter(|item| {
            item.types()
                .iter()
                .any(|t| wanted.contains(&t.to_lowercase()))
        })
        .cloned()
        .collect()
}

/// Keep items whose height lies within `[min, max]` metres
pub fn filter_by_height_range<T: Filterable + Clone>(
    list: &[T],
    min_metres: Option<f64>,
    max_metres: Option<f64>,
) -> Vec<T> {
    filter_by_range(list, RangeFilter::new(min_metres, max_metres), T::height)
}

/// Keep items whose weight lies within `[min, max]` kilograms
pub fn filter_by_weight_range<T: Filterable + Clone>(
    list: &[T],
    min_kg: Option<f64>,
    max_kg: Option<f64>,
) -> Vec<T> {
    filter_by_range(list, RangeFilter::new(min_kg, max_kg), T::weight)
}

fn filter_by_range<T, F>(list: &[T], range: RangeFilter, value: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> Option<i64>,
{
    if !range.is_active() {
        return list.to_vec();
    }
    list.iter()
        .filter(|item| value(*item).is_some_and(|raw| range.contains_raw(raw)))
        .cloned()
        .collect()
}

/// Inclusive bounds in display units (metres or kilograms)
///
/// NaN bounds count as unset. An item with no measurement never matches an
/// active range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeFilter {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min: min.filter(|v| !v.is_nan()),
            max: max.filter(|v| !v.is_nan()),
        }
    }

    /// Whether at least one bound is set
    pub fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// Check a raw value stored in tenths of the display unit
    pub fn contains_raw(&self, raw: i64) -> bool {
        let raw = raw as f64;
        if let Some(min) = self.min.map(to_tenths) {
            if raw < min {
                return false;
            }
        }
        if let Some(max) = self.max.map(to_tenths) {
            if raw > max {
                return false;
            }
        }
        true
    }
}

/// Scale a display-unit bound to tenths, dropping binary fraction noise
/// (0.3 * 10 is 3.0000000000000004 otherwise)
fn to_tenths(value: f64) -> f64 {
    (value * 10.0 * 1e9).round() / 1e9
}

/// Field to order by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Id,
    Name,
    Height,
    Weight,
    #[serde(alias = "ownedAt")]
    CaughtAt,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::Height => "height",
            SortKey::Weight => "weight",
            SortKey::CaughtAt => "caughtAt",
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortKey::Id),
            "name" => Ok(SortKey::Name),
            "height" => Ok(SortKey::Height),
            "weight" => Ok(SortKey::Weight),
            "caughtAt" | "ownedAt" | "caught_at" | "owned_at" => Ok(SortKey::CaughtAt),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

/// A key and direction pair, written as `"<key>-<dir>"` (e.g. `name-desc`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOption {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortOption {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Parse an option, falling back to the default for anything unknown
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl Default for SortOption {
    fn default() -> Self {
        Self::new(SortKey::Id, SortDirection::Asc)
    }
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, dir) = s
            .trim()
            .rsplit_once('-')
            .ok_or_else(|| format!("expected <key>-<asc|desc>, got '{}'", s))?;
        Ok(Self::new(key.parse()?, dir.parse()?))
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.key, self.direction)
    }
}

/// Return a sorted copy of `list`
///
/// The sort is stable, so items comparing equal keep their input order.
/// Missing ids, heights and weights sort as 0; a missing or unparseable
/// owned-at timestamp sorts as the epoch.
pub fn sort_by<T: Filterable + Clone>(list: &[T], key: SortKey, direction: SortDirection) -> Vec<T> {
    let mut sorted = list.to_vec();
    sorted.sort_by(|a, b| direction.apply(compare(a, b, key)));
    sorted
}

fn compare<T: Filterable>(a: &T, b: &T, key: SortKey) -> Ordering {
    match key {
        SortKey::Id => a.id().unwrap_or(0).cmp(&b.id().unwrap_or(0)),
        SortKey::Name => compare_names(a.name(), b.name()),
        SortKey::Height => a.height().unwrap_or(0).cmp(&b.height().unwrap_or(0)),
        SortKey::Weight => a.weight().unwrap_or(0).cmp(&b.weight().unwrap_or(0)),
        SortKey::CaughtAt => timestamp_millis(a.owned_at()).cmp(&timestamp_millis(b.owned_at())),
    }
}

/// Alphabetical order ignoring case and accents
///
/// Names equal after folding fall back to their lowercase form, so
/// "eevee" still sorts before "éevee".
fn compare_names(a: &str, b: &str) -> Ordering {
    fold_name(a)
        .cmp(&fold_name(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
}

fn fold_name(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Epoch milliseconds for an ISO-8601 timestamp, 0 when missing or garbled
pub fn timestamp_millis(value: Option<&str>) -> i64 {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return 0;
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.timestamp_millis();
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// Split a comma-separated type selection, dropping blanks
pub fn parse_types(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Every filter and the sort order a list view can ask for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionQuery {
    pub name: String,
    pub types: Vec<String>,
    pub height: RangeFilter,
    pub weight: RangeFilter,
    /// `None` keeps the input order
    pub sort: Option<SortOption>,
}

impl CollectionQuery {
    /// Run every stage in order
    pub fn apply<T: Filterable + Clone>(&self, list: &[T]) -> Vec<T> {
        let list = filter_by_name(list, &self.name);
        let list = filter_by_type(&list, &self.types);
        let list = filter_by_height_range(&list, self.height.min, self.height.max);
        let list = filter_by_weight_range(&list, self.weight.min, self.weight.max);
        match self.sort {
            Some(option) => sort_by(&list, option.key, option.direction),
            None => list,
        }
    }

    /// Whether any stage would drop items
    pub fn is_filtering(&self) -> bool {
        !self.name.trim().is_empty()
            || !self.types.is_empty()
            || self.height.is_active()
            || self.weight.is_active()
    }
}
