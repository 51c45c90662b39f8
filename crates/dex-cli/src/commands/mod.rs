//! Command handlers

pub mod catalogue;
pub mod collection;
pub mod config;
pub mod export;
pub mod note;
pub mod status;

use clap::Args;

use dex_core::filters::parse_types;
use dex_core::{CollectionQuery, EntryId, RangeFilter, SortOption};

use crate::context::AppContext;

/// Filter and sort flags shared by list views
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Case-insensitive name substring
    #[arg(long)]
    pub name: Option<String>,

    /// Comma-separated types; an entry matches if it has any of them
    #[arg(long)]
    pub types: Option<String>,

    /// Minimum height in metres
    #[arg(long)]
    pub min_height: Option<f64>,

    /// Maximum height in metres
    #[arg(long)]
    pub max_height: Option<f64>,

    /// Minimum weight in kilograms
    #[arg(long)]
    pub min_weight: Option<f64>,

    /// Maximum weight in kilograms
    #[arg(long)]
    pub max_weight: Option<f64>,

    /// Sort order as <key>-<asc|desc> (id, name, height, weight, caughtAt)
    #[arg(long)]
    pub sort: Option<String>,
}

impl FilterArgs {
    /// Build the query; an unknown sort falls back to id-asc
    pub fn to_query(&self) -> CollectionQuery {
        CollectionQuery {
            name: self.name.clone().unwrap_or_default(),
            types: self.types.as_deref().map(parse_types).unwrap_or_default(),
            height: RangeFilter::new(self.min_height, self.max_height),
            weight: RangeFilter::new(self.min_weight, self.max_weight),
            sort: self.sort.as_deref().map(SortOption::parse_or_default),
        }
    }
}

/// Name of a cached entry, or `#id` when it isn't cached
pub(crate) fn display_name(ctx: &AppContext, id: EntryId) -> String {
    ctx.cache
        .get(id)
        .map(|entry| entry.name)
        .unwrap_or_else(|| format!("#{}", id))
}

/// Names for several ids, looked up in one cache read
pub(crate) fn display_names(ctx: &AppContext, ids: &[EntryId]) -> Vec<String> {
    let index = ctx.cache.index();
    ids.iter()
        .map(|id| match index.get(id) {
            Some(entry) => entry.name.clone(),
            None => format!("#{}", id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_core::{SortDirection, SortKey};

    #[test]
    fn test_empty_args_filter_nothing() {
        let query = FilterArgs::default().to_query();
        assert!(!query.is_filtering());
        assert!(query.sort.is_none());
    }

    #[test]
    fn test_to_query() {
        let args = FilterArgs {
            name: Some("saur".to_string()),
            types: Some("grass, poison,,".to_string()),
            min_height: Some(0.5),
            max_weight: Some(f64::NAN),
            sort: Some("weight-desc".to_string()),
            ..Default::default()
        };
        let query = args.to_query();

        assert_eq!(query.name, "saur");
        assert_eq!(query.types, vec!["grass", "poison"]);
        assert_eq!(query.height.min, Some(0.5));
        assert!(!query.weight.is_active());
        assert_eq!(
            query.sort,
            Some(SortOption::new(SortKey::Weight, SortDirection::Desc))
        );
    }

    #[test]
    fn test_display_names_mark_uncached() {
        let ctx = AppContext::in_memory();
        ctx.cache.put(dex_core::Entry::new(25, "pikachu"));

        assert_eq!(display_names(&ctx, &[25, 3]), vec!["pikachu", "#3"]);
        assert_eq!(display_name(&ctx, 3), "#3");
    }

    #[test]
    fn test_unknown_sort_is_default() {
        let args = FilterArgs {
            sort: Some("colour-up".to_string()),
            ..Default::default()
        };
        assert_eq!(args.to_query().sort, Some(SortOption::default()));
    }
}
