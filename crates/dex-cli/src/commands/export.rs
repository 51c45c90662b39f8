//! Export command handler

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;

use dex_core::export::{build_export, export_filename};
use dex_core::storage::atomic_write;
use dex_core::CollectionQuery;

use crate::commands::collection::owned_rows;
use crate::context::AppContext;
use crate::output::{Output, OutputFormat};

/// Write the owned entries as CSV
///
/// Goes to `path` when given, otherwise to a dated file in the export
/// directory. With `to_stdout` the CSV is printed instead.
pub fn export(
    ctx: &AppContext,
    path: Option<PathBuf>,
    to_stdout: bool,
    query: &CollectionQuery,
    output: &Output,
) -> Result<()> {
    let rows = owned_rows(ctx, query);
    let csv = build_export(&rows);

    if to_stdout {
        print!("{}", csv);
        if !csv.ends_with('\n') {
            println!();
        }
        return Ok(());
    }

    let path = path.unwrap_or_else(|| default_export_path(ctx));
    atomic_write(&path, csv.as_bytes())
        .with_context(|| format!("Failed to export collection to {:?}", path))?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "path": path,
                    "count": rows.len(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", path.display());
        }
        OutputFormat::Human => {
            output.success(&format!(
                "Exported {} entr{} to {}",
                rows.len(),
                if rows.len() == 1 { "y" } else { "ies" },
                path.display()
            ));
        }
    }

    Ok(())
}

fn default_export_path(ctx: &AppContext) -> PathBuf {
    ctx.config
        .export_dir()
        .join(export_filename(Local::now().date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_core::Entry;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_owned_rows() {
        let temp_dir = TempDir::new().unwrap();
        let mut ctx = AppContext::in_memory();
        ctx.cache.put_many(vec![
            Entry::new(1, "bulbasaur")
                .with_types(["grass", "poison"])
                .with_measurements(Some(7), Some(69)),
            Entry::new(4, "charmander").with_types(["fire"]),
        ]);
        ctx.store
            .mark_owned(1, Some("2025-02-01T12:00:00.000Z".to_string()));
        ctx.store.set_note(1, "First catch");

        let path = temp_dir.path().join("out").join("collection.csv");
        let output = Output::new(OutputFormat::Quiet);
        export(&ctx, Some(path.clone()), false, &CollectionQuery::default(), &output).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "Id,Name,Types,Height,Weight,Owned At,Note\n\
             1,bulbasaur,\"grass, poison\",7,69,2025/02/01 12:00:00,First catch"
        );
    }

    #[test]
    fn test_default_path_uses_export_dir() {
        let temp_dir = TempDir::new().unwrap();
        let mut ctx = AppContext::in_memory();
        ctx.config.export_dir = Some(temp_dir.path().to_path_buf());

        let path = default_export_path(&ctx);
        assert!(path.starts_with(temp_dir.path()));

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("collection-"));
        assert!(name.ends_with(".csv"));
    }
}
