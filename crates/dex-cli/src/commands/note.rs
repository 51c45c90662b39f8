//! Note command handlers
//!
//! Every entry can carry one free-text note, owned or not.

use anyhow::{Context, Result};

use dex_core::EntryId;

use crate::commands::display_name;
use crate::context::AppContext;
use crate::editor::edit_note;
use crate::output::{Output, OutputFormat};

/// Set the note on an entry, opening the editor when no text is given
pub fn set(ctx: &mut AppContext, id: EntryId, text: Option<String>, output: &Output) -> Result<()> {
    let name = display_name(ctx, id);

    let text = match text {
        Some(t) => t,
        None => edit_note(&name, &ctx.store.get_note(id)).context("Failed to edit note")?,
    };

    ctx.store.set_note(id, text.as_str());

    if text.is_empty() {
        output.success(&format!("Cleared note on {}", name));
    } else {
        output.success(&format!("Saved note on {}", name));
    }

    Ok(())
}

/// Print the note on an entry
pub fn show(ctx: &AppContext, id: EntryId, output: &Output) -> Result<()> {
    let note = ctx.store.get_note(id);

    match output.format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({"id": id, "note": note}));
        }
        OutputFormat::Quiet => {
            if !note.is_empty() {
                println!("{}", note);
            }
        }
        OutputFormat::Human => {
            if note.is_empty() {
                println!("No note on {}.", display_name(ctx, id));
            } else {
                println!("{}", note);
            }
        }
    }

    Ok(())
}

/// Remove the note on an entry
pub fn clear(ctx: &mut AppContext, id: EntryId, output: &Output) -> Result<()> {
    ctx.store.set_note(id, "");
    output.success(&format!("Cleared note on {}", display_name(ctx, id)));
    Ok(())
}
