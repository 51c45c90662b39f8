//! Note editing and release prompts
//!
//! `edit_note` round-trips a note through the user's editor, and
//! `confirm_release` asks before entries (and their notes) are dropped.

use std::env;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::debug;

const NOTE_HELP: &str = "# Lines starting with '#' are ignored. Save an empty note to clear it.";

/// Tried in order when neither $EDITOR nor $VISUAL is set
const FALLBACK_EDITORS: [&str; 4] = ["nano", "vim", "vi", "notepad"];

/// Names listed in a release prompt before the rest are counted
const PROMPT_NAME_LIMIT: usize = 5;

/// Edit the note on `name` in the user's editor
///
/// The editor opens on `current` under a comment header. Comment lines are
/// dropped from the result and the rest is trimmed, so an empty string
/// means the note was cleared.
pub fn edit_note(name: &str, current: &str) -> Result<String> {
    let edited = edit_text(&note_template(name, current))?;
    Ok(parse_note(&edited))
}

fn note_template(name: &str, current: &str) -> String {
    format!("# Note for {}\n{}\n\n{}", name, NOTE_HELP, current)
}

fn parse_note(edited: &str) -> String {
    edited
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn edit_text(initial: &str) -> Result<String> {
    let (program, args) = editor_command()?;

    let mut file = tempfile::Builder::new()
        .prefix("dex-note-")
        .suffix(".txt")
        .tempfile()
        .context("Failed to create a temporary note file")?;
    file.write_all(initial.as_bytes())
        .context("Failed to write the temporary note file")?;
    file.flush()?;

    debug!("Editing {:?} with {}", file.path(), program);
    let status = Command::new(&program)
        .args(&args)
        .arg(file.path())
        .status()
        .with_context(|| format!("Failed to run editor: {}", program))?;

    if !status.success() {
        bail!(
            "Editor '{}' exited with {}. The note was left unchanged.",
            program,
            status
        );
    }

    // Editors may replace the file instead of writing through our handle
    fs::read_to_string(file.path()).context("Failed to read the edited note")
}

/// Program and leading arguments of the user's editor
fn editor_command() -> Result<(String, Vec<String>)> {
    let configured = ["EDITOR", "VISUAL"]
        .iter()
        .find_map(|var| env::var(var).ok().and_then(|value| split_command(&value)));
    if let Some(command) = configured {
        return Ok(command);
    }

    FALLBACK_EDITORS
        .iter()
        .find(|name| on_path(name))
        .map(|name| (name.to_string(), Vec::new()))
        .context("No editor found. Set $EDITOR, e.g. export EDITOR=nano")
}

/// Split an editor setting such as `code --wait`
fn split_command(value: &str) -> Option<(String, Vec<String>)> {
    let mut parts = value.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

fn on_path(program: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&paths).any(|dir| is_program(&dir, program))
}

fn is_program(dir: &Path, program: &str) -> bool {
    dir.join(program).is_file() || dir.join(format!("{}.exe", program)).is_file()
}

/// Ask before releasing the named entries
///
/// Without a terminal on stdin nothing can be answered, so this declines.
pub fn confirm_release(names: &[String]) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }
    ask(&release_prompt(names), &mut io::stdin().lock(), &mut io::stdout())
}

fn release_prompt(names: &[String]) -> String {
    let listed = if names.len() > PROMPT_NAME_LIMIT {
        format!(
            "{} and {} more",
            names[..PROMPT_NAME_LIMIT].join(", "),
            names.len() - PROMPT_NAME_LIMIT
        )
    } else {
        names.join(", ")
    };
    let notes = if names.len() == 1 { "its note" } else { "their notes" };
    format!("Release {}? This also deletes {}.", listed, notes)
}

fn ask(prompt: &str, input: &mut impl BufRead, out: &mut impl Write) -> Result<bool> {
    write!(out, "{} [y/N] ", prompt)?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
