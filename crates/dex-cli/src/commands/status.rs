//! Status command handler

use anyhow::{Context, Result};

use crate::context::AppContext;
use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(ctx: &AppContext, output: &Output) -> Result<()> {
    let stats = ctx.kv.stats().context("Failed to read database stats")?;
    let config = &ctx.config;
    let cached = ctx.cache.len();
    let progress = ctx.store.progress(cached);
    let notes = ctx.store.notes().count();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "database": ctx.kv.path(),
                    "storage": {
                        "keys": stats.keys,
                        "value_bytes": stats.value_bytes,
                        "file_bytes": stats.file_bytes,
                        "quota": config.storage_quota
                    },
                    "counts": {
                        "owned": progress.owned,
                        "cached": cached,
                        "notes": notes
                    },
                    "progress": progress
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", progress.owned);
        }
        OutputFormat::Human => {
            println!("Dex Status");
            println!("==========");
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!("  Size:     {}", human_bytes(stats.file_bytes));
            println!(
                "  Payloads: {} ({} of {} per value)",
                stats.keys,
                human_bytes(stats.value_bytes as u64),
                human_bytes(config.storage_quota as u64)
            );
            println!();
            println!("Contents:");
            println!("  Owned:  {}", progress.owned);
            println!("  Cached: {}", cached);
            println!("  Notes:  {}", notes);
            println!();
            output.print_progress(&progress);
        }
    }

    Ok(())
}

/// Format a byte count for humans
fn human_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
