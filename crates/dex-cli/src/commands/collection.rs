//! Collection command handlers

use anyhow::{bail, Result};
use chrono::DateTime;

use dex_core::{CollectionQuery, CollectionRow, EntryId, Progress};

use crate::commands::{display_name, display_names};
use crate::context::AppContext;
use crate::editor::confirm_release;
use crate::output::{Output, OutputFormat};

/// Mark an entry as owned
pub fn catch(ctx: &mut AppContext, id: EntryId, at: Option<String>, output: &Output) -> Result<()> {
    if let Some(ref at) = at {
        if DateTime::parse_from_rfc3339(at).is_err() {
            bail!(
                "Invalid timestamp: {}. Use RFC 3339, e.g. 2025-02-01T12:00:00Z",
                at
            );
        }
    }

    let was_owned = ctx.store.is_owned(id);
    ctx.store.mark_owned(id, at);

    let name = display_name(ctx, id);
    if was_owned {
        output.success(&format!("Updated catch time for {}", name));
    } else {
        output.success(&format!("Caught {}", name));
    }

    Ok(())
}

/// Release entries from the collection, dropping their notes
pub fn release(ctx: &mut AppContext, ids: Vec<EntryId>, yes: bool, output: &Output) -> Result<()> {
    let owned: Vec<EntryId> = ids.into_iter().filter(|id| ctx.store.is_owned(*id)).collect();
    if owned.is_empty() {
        output.message("Nothing to release.");
        return Ok(());
    }

    if output.should_prompt() && !yes && !confirm_release(&display_names(ctx, &owned))? {
        output.message("Cancelled.");
        return Ok(());
    }

    ctx.store.release_many(&owned);
    output.success(&format!("Released {} entr{}", owned.len(), if owned.len() == 1 { "y" } else { "ies" }));

    Ok(())
}

/// Owned rows from the cache, filtered and sorted
pub(crate) fn owned_rows(ctx: &AppContext, query: &CollectionQuery) -> Vec<CollectionRow> {
    query.apply(&ctx.store.owned_rows(&ctx.cache.all()))
}

/// Filtered collection rows plus what the listing reports about them
struct CollectionView {
    rows: Vec<CollectionRow>,
    progress: Progress,
    /// Owned ids with no cached entry to show
    uncached: usize,
}

/// Build the collection listing from a single read of the cache
fn collection_view(ctx: &AppContext, query: &CollectionQuery) -> CollectionView {
    let entries = ctx.cache.all();
    let owned = ctx.store.owned_rows(&entries);

    CollectionView {
        uncached: ctx.store.owned_count().saturating_sub(owned.len()),
        rows: query.apply(&owned),
        progress: ctx.store.progress(entries.len()),
    }
}

/// Show the collection and progress through the cached catalogue
pub fn show(ctx: &AppContext, query: &CollectionQuery, output: &Output) -> Result<()> {
    let CollectionView {
        rows,
        progress,
        uncached,
    } = collection_view(ctx, query);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "progress": progress,
                    "entries": rows,
                })
            );
        }
        _ => {
            output.print_rows(&rows);
            output.print_progress(&progress);

            if uncached > 0 {
                output.message(&format!(
                    "{} owned entr{} not in the cache; import the catalogue to list them.",
                    uncached,
                    if uncached == 1 { "y is" } else { "ies are" }
                ));
            }
        }
    }

    Ok(())
}
