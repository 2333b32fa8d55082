//! Research History CLI
//!
//! The `rhist` command inspects and edits a research history kept in a
//! directory on disk.
//!
//! ## Commands
//!
//! - `save`: Record a research session
//! - `list`: Show saved sessions, newest first
//! - `show`: Print one session
//! - `delete`: Remove one session
//! - `clear`: Remove every session
//! - `stats`: Show record count and size against the configured bounds

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use research_history::{
    FsKeyValueStore, HistoryConfig, HistoryRecord, HistoryStore, PersistOutcome, RecordId,
    ResearchEntry,
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "rhist")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bounded research history store", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding the persisted history
    #[arg(long, global = true, default_value = ".research-history")]
    data_dir: PathBuf,

    /// TOML file overriding the storage key and limits
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reject writes that would make the data directory exceed this many bytes
    #[arg(long, global = true)]
    capacity: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a research session
    Save {
        /// The research question
        #[arg(short, long)]
        question: String,

        /// The produced answer (use --answer-file for long reports)
        #[arg(short, long, conflicts_with = "answer_file")]
        answer: Option<String>,

        /// Read the answer from a file
        #[arg(long)]
        answer_file: Option<PathBuf>,

        /// JSON array of research events
        #[arg(short, long)]
        entries: Option<PathBuf>,
    },

    /// List saved sessions, newest first
    List {
        /// Print records as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Print one session
    Show {
        /// Record id
        id: String,

        /// Print the record as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Remove one session
    Delete {
        /// Record id
        id: String,
    },

    /// Remove every session and the persisted file
    Clear,

    /// Show record count and size against the configured bounds
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    research_history::init_tracing(cli.json, level);

    let mut store = open_store(&cli)?;

    match cli.command {
        Commands::Save {
            question,
            answer,
            answer_file,
            entries,
        } => cmd_save(&mut store, &question, answer, answer_file, entries),
        Commands::List { raw } => cmd_list(&store, raw),
        Commands::Show { id, raw } => cmd_show(&store, &id, raw),
        Commands::Delete { id } => cmd_delete(&mut store, &id),
        Commands::Clear => cmd_clear(&mut store),
        Commands::Stats => cmd_stats(&store),
    }
}

fn open_store(cli: &Cli) -> Result<HistoryStore<FsKeyValueStore>> {
    let config = match &cli.config {
        Some(path) => HistoryConfig::from_path(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => HistoryConfig::default(),
    };

    let mut backend = FsKeyValueStore::new(&cli.data_dir)
        .with_context(|| format!("Failed to open data directory {:?}", cli.data_dir))?;
    if let Some(capacity) = cli.capacity {
        backend = backend.with_capacity(capacity);
    }

    info!(data_dir = ?cli.data_dir, key = %config.storage_key, "Opening history");
    Ok(HistoryStore::with_config(backend, config))
}

/// Save a session
fn cmd_save(
    store: &mut HistoryStore<FsKeyValueStore>,
    question: &str,
    answer: Option<String>,
    answer_file: Option<PathBuf>,
    entries: Option<PathBuf>,
) -> Result<()> {
    let answer = match (answer, answer_file) {
        (Some(answer), _) => answer,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read answer file: {:?}", path))?,
        (None, None) => String::new(),
    };
    let entries: Vec<ResearchEntry> = match entries {
        Some(path) => read_json_file(&path)?,
        None => Vec::new(),
    };

    let id = store.save(question, &answer, &entries);
    println!("Saved {}", id);

    match store.last_outcome() {
        Some(PersistOutcome::Written) | None => {}
        Some(PersistOutcome::RecoveredStale) => {
            eprintln!("warning: storage full; kept the previous history on disk")
        }
        Some(PersistOutcome::Minimal) => {
            eprintln!("warning: storage full; history reduced to a minimal copy")
        }
        Some(PersistOutcome::Volatile) => {
            eprintln!("warning: history could not be written and was removed from disk")
        }
    }
    Ok(())
}

/// List sessions
fn cmd_list(store: &HistoryStore<FsKeyValueStore>, raw: bool) -> Result<()> {
    if raw {
        println!("{}", serde_json::to_string_pretty(store.records())?);
        return Ok(());
    }

    if store.is_empty() {
        println!("No saved research.");
        return Ok(());
    }

    for record in store.records() {
        println!(
            "{}  {}  {}",
            record.id,
            record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            one_line(&record.question, 60)
        );
    }
    Ok(())
}

/// Show one session
fn cmd_show(store: &HistoryStore<FsKeyValueStore>, id: &str, raw: bool) -> Result<()> {
    let record = store
        .get_by_id(&RecordId::from(id))
        .with_context(|| format!("No saved research with id '{}'", id))?;

    if raw {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        print_record(record);
    }
    Ok(())
}

/// Delete one session
fn cmd_delete(store: &mut HistoryStore<FsKeyValueStore>, id: &str) -> Result<()> {
    if store.delete(&RecordId::from(id)) {
        println!("Deleted {}", id);
        Ok(())
    } else {
        anyhow::bail!("No saved research with id '{}'", id)
    }
}

/// Clear the history
fn cmd_clear(store: &mut HistoryStore<FsKeyValueStore>) -> Result<()> {
    let count = store.len();
    store.clear();
    println!("Cleared {} record(s)", count);
    Ok(())
}

/// Report bounds
fn cmd_stats(store: &HistoryStore<FsKeyValueStore>) -> Result<()> {
    let stats = store.stats();
    println!("Records: {}/{}", stats.records, stats.max_records);
    println!("Bytes:   {}/{}", stats.bytes, stats.max_bytes);
    println!("Key:     {}", store.config().storage_key);
    println!("Dir:     {}", store.backend().root().display());
    Ok(())
}

fn print_record(record: &HistoryRecord) {
    print!("{}", render_record(record));
}

fn render_record(record: &HistoryRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Id:       {}", record.id);
    let _ = writeln!(
        out,
        "Date:     {}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "Question: {}", record.question);
    let _ = writeln!(out);
    for line in record.answer.lines() {
        let _ = writeln!(out, "    {}", line);
    }
    if !record.ordered_data.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Events:");
        for entry in &record.ordered_data {
            let _ = writeln!(out, "  - {}", describe_entry(entry));
        }
    }
    out
}

fn describe_entry(entry: &ResearchEntry) -> String {
    let kind = match entry {
        ResearchEntry::Basic(_) => "basic",
        ResearchEntry::Question(_) => "question",
        ResearchEntry::Chat(_) => "chat",
        ResearchEntry::Error(_) => "error",
        ResearchEntry::Differences(_) => "differences",
        ResearchEntry::ExternalLink(link) => return format!("external-link {}", link.url),
    };
    match entry.text() {
        Some(text) => format!("{} {}", kind, one_line(&text.content, 70)),
        None => kind.to_string(),
    }
}

/// First line of `text`, cut to `max` characters.
fn one_line(text: &str, max: usize) -> String {
    let first = text.lines().next().unwrap_or("");
    research_history::truncate_with_ellipsis(first, max)
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}
