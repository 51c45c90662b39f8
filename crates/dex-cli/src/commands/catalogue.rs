//! Catalogue command handlers
//!
//! Importing a catalogue file into the entry cache and browsing it.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use dex_core::{CollectionQuery, EntryId, EntrySource, JsonCatalogue};

use crate::context::AppContext;
use crate::output::Output;

/// Load a JSON catalogue file into the entry cache, one page at a time
pub fn import(ctx: &AppContext, file: &Path, output: &Output) -> Result<()> {
    let catalogue = JsonCatalogue::from_path(file)?;
    let count = import_from(ctx, &catalogue, ctx.config.page_size)?;

    info!("Imported {} entries from {:?}", count, file);
    output.success(&format!(
        "Imported {} entries ({} cached)",
        count,
        ctx.cache.len()
    ));

    Ok(())
}

/// Copy every page of `source` into the cache; returns the entry count
pub(crate) fn import_from(
    ctx: &AppContext,
    source: &impl EntrySource,
    page_size: usize,
) -> Result<usize> {
    let mut offset = 0;
    loop {
        let page = source
            .fetch_page(page_size, offset)
            .with_context(|| format!("Failed to fetch entries at offset {}", offset))?;
        if page.items.is_empty() {
            break;
        }

        let fetched = page.items.len();
        let more = page.has_more(offset);
        ctx.cache.put_many(page.items);
        offset += fetched;

        if !more {
            break;
        }
    }
    Ok(offset)
}

/// List one page of cached entries
pub fn list(
    ctx: &AppContext,
    page: usize,
    limit: Option<usize>,
    query: &CollectionQuery,
    output: &Output,
) -> Result<()> {
    if ctx.cache.is_empty() {
        output.message("No entries cached. Run `dex import <file>` first.");
        return Ok(());
    }

    let page = page.max(1);
    let limit = limit.unwrap_or(ctx.config.page_size).max(1);
    let Some(offset) = (page - 1).checked_mul(limit) else {
        bail!("Page {} is out of range for {} entries per page", page, limit);
    };

    let fetched = ctx.cache.fetch_page(limit, offset)?;
    let rows = query.apply(&ctx.store.rows(&fetched.items));

    output.print_rows(&rows);
    output.print_page_info(page, offset, fetched.items.len(), fetched.total);

    Ok(())
}

/// Show one entry with its ownership and note
pub fn show(ctx: &AppContext, id: EntryId, output: &Output) -> Result<()> {
    let Some(entry) = ctx.cache.fetch_by_id(id)? else {
        bail!("Entry not found: {}. Import a catalogue that contains it.", id);
    };

    let rows = ctx.store.rows(std::slice::from_ref(&entry));
    if let Some(row) = rows.first() {
        output.print_row(row);
    }

    Ok(())
}
