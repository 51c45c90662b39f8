//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use dex_core::export::format_owned_at;
use dex_core::{CollectionRow, Progress};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single entry with its collection details
    pub fn print_row(&self, row: &CollectionRow) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", row.id);
                println!("Name:     {}", row.name);
                if !row.types.is_empty() {
                    println!("Types:    {}", row.types.join(", "));
                }
                if let Some(height) = row.height {
                    println!("Height:   {} m", tenths(height));
                }
                if let Some(weight) = row.weight {
                    println!("Weight:   {} kg", tenths(weight));
                }
                if let Some(ref url) = row.image_url {
                    println!("Image:    {}", url);
                }
                match row.owned_at {
                    Some(ref at) => println!("Owned:    {}", format_owned_at(at)),
                    None => println!("Owned:    no"),
                }

                if let Some(ref note) = row.note {
                    println!();
                    println!("── Note ──");
                    println!("{}", note);
                }
            }
            OutputFormat::Json => print_json(row),
            OutputFormat::Quiet => {
                println!("{}", row.id);
            }
        }
    }

    /// Print a list of entries
    pub fn print_rows(&self, rows: &[CollectionRow]) {
        match self.format {
            OutputFormat::Human => {
                if rows.is_empty() {
                    println!("No entries found.");
                    return;
                }
                for row in rows {
                    let marker = if row.is_owned() { "●" } else { "○" };
                    let note_indicator = if row.note.is_some() { " ✎" } else { "" };
                    println!(
                        "{} {:>5} | {:<20} | {}{}",
                        marker,
                        row.id,
                        truncate(&row.name, 20),
                        truncate(&row.types.join(", "), 25),
                        note_indicator
                    );
                }
                println!("\n{} entr{}", rows.len(), if rows.len() == 1 { "y" } else { "ies" });
            }
            OutputFormat::Json => print_json(rows),
            OutputFormat::Quiet => {
                for row in rows {
                    println!("{}", row.id);
                }
            }
        }
    }

    /// Print collection progress
    pub fn print_progress(&self, progress: &Progress) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "Collected {} of {} ({}%)",
                    progress.owned,
                    progress.total,
                    progress.rounded_percent()
                );
            }
            OutputFormat::Json => print_json(progress),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a page position line
    pub fn print_page_info(&self, page: usize, offset: usize, shown: usize, total: usize) {
        if self.format == OutputFormat::Human && total > 0 {
            let first = if shown == 0 { 0 } else { offset + 1 };
            println!("Page {} ({}-{} of {})", page, first, offset + shown, total);
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// Render a raw tenths value as a decimal
fn tenths(raw: i64) -> String {
    format!("{:.1}", raw as f64 / 10.0)
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("flabébé-flabébé", 10), "flabébé...");
    }

    #[test]
    fn test_tenths() {
        assert_eq!(tenths(7), "0.7");
        assert_eq!(tenths(905), "90.5");
        assert_eq!(tenths(0), "0.0");
    }

    #[test]
    fn test_should_prompt_only_for_humans() {
        assert!(Output::new(OutputFormat::Human).should_prompt());
        assert!(!Output::new(OutputFormat::Json).should_prompt());
        assert!(!Output::new(OutputFormat::Quiet).should_prompt());
    }
}
