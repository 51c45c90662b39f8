//! Dex CLI
//!
//! Command-line interface for dex - track a collection over a catalogue,
//! with notes, filters and CSV export.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dex_core::{Config, EntryId};

mod commands;
mod context;
mod editor;
mod output;

use commands::FilterArgs;
use context::AppContext;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "dex")]
#[command(about = "Dex - track your collection, take notes, export to CSV")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a JSON catalogue into the local cache
    Import {
        /// Catalogue file (array of entries or {"items": [...], "total": n})
        file: PathBuf,
    },
    /// List cached entries
    #[command(alias = "ls")]
    List {
        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        /// Entries per page (defaults to page_size)
        #[arg(short, long)]
        limit: Option<usize>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Show one entry
    Show {
        /// Entry ID
        id: EntryId,
    },
    /// Mark an entry as owned
    #[command(alias = "add")]
    Catch {
        /// Entry ID
        id: EntryId,
        /// When it was caught (RFC 3339, defaults to now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Remove entries from the collection
    #[command(alias = "rm")]
    Release {
        /// Entry IDs
        #[arg(required = true)]
        ids: Vec<EntryId>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Manage entry notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Show owned entries and progress
    Collection {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Export owned entries as CSV
    Export {
        /// Output file (defaults to collection-<date>.csv in export_dir)
        #[arg(short, long, conflicts_with = "stdout")]
        output: Option<PathBuf>,
        /// Print the CSV instead of writing a file
        #[arg(long)]
        stdout: bool,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show storage and collection status
    Status,
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Set the note on an entry
    Set {
        /// Entry ID
        id: EntryId,
        /// Note text (opens editor if not provided)
        #[arg(short, long)]
        text: Option<String>,
    },
    /// Print the note on an entry
    Show {
        /// Entry ID
        id: EntryId,
    },
    /// Remove the note on an entry
    #[command(alias = "rm")]
    Clear {
        /// Entry ID
        id: EntryId,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, page_size, storage_quota, export_dir, log_file)
        key: String,
        /// Configuration value ("none" clears optional keys)
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_deref();

    // Config commands work even when the data directory is unusable
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    let mut ctx = AppContext::open(config)?;
    debug!("Collection holds {} entries", ctx.store.owned_count());

    match cli.command {
        Commands::Import { file } => commands::catalogue::import(&ctx, &file, &output),
        Commands::List {
            page,
            limit,
            filters,
        } => commands::catalogue::list(&ctx, page, limit, &filters.to_query(), &output),
        Commands::Show { id } => commands::catalogue::show(&ctx, id, &output),
        Commands::Catch { id, at } => commands::collection::catch(&mut ctx, id, at, &output),
        Commands::Release { ids, yes } => {
            commands::collection::release(&mut ctx, ids, yes, &output)
        }
        Commands::Note { command } => handle_note_command(command, &mut ctx, &output),
        Commands::Collection { filters } => {
            commands::collection::show(&ctx, &filters.to_query(), &output)
        }
        Commands::Export {
            output: path,
            stdout,
            filters,
        } => commands::export::export(&ctx, path, stdout, &filters.to_query(), &output),
        Commands::Status => commands::status::show(&ctx, &output),
        Commands::Config { .. } => Ok(()), // Handled above
    }
}

fn handle_note_command(command: NoteCommands, ctx: &mut AppContext, output: &Output) -> Result<()> {
    match command {
        NoteCommands::Set { id, text } => commands::note::set(ctx, id, text, output),
        NoteCommands::Show { id } => commands::note::show(ctx, id, output),
        NoteCommands::Clear { id } => commands::note::clear(ctx, id, output),
    }
}

/// Set up tracing
///
/// `DEX_LOG` replaces the default filter. Logs go to the configured
/// log file when there is one, otherwise to stderr.
fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = std::env::var("DEX_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(format!("dex_core={},dex={}", level, level)));

    if let Some(ref log_path) = config.log_file {
        match OpenOptions::new().create(true).append(true).open(log_path) {
            Ok(log_file) => {
                // Ignore error if already initialized
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(log_file))
                    .try_init();
                return;
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
