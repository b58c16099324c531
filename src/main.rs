mod config;
mod db;
mod error;
mod fetch;
mod parser;
mod pipeline;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use db::{Record, RecordFilter, Store};

#[derive(Parser)]
#[command(name = "article_scraper", about = "Scrape headline links into a local article store")]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Database path, overrides the settings file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the source page and store any new records
    Scrape {
        /// Read markup from a saved page instead of fetching
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List stored records
    List {
        /// Only saved records
        #[arg(long, conflicts_with = "unsaved")]
        saved: bool,
        /// Only records not saved
        #[arg(long)]
        unsaved: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show one record with its note
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Attach a note to a record, replacing any previous one
    Note {
        id: i64,
        #[arg(required = true, num_args = 1..)]
        body: Vec<String>,
    },
    /// Show a note by its own id
    NoteShow { id: i64 },
    /// Mark a record as saved
    Save { id: i64 },
    /// Remove a record from the saved list
    Unsave { id: i64 },
    /// Show store counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = config::Settings::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        settings.database_path = db;
    }

    match cli.command {
        Commands::Scrape { file } => {
            let (source, store) = scrape_setup(&settings)?;
            let report = match file {
                Some(path) => {
                    let markup = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {:?}", path))?;
                    pipeline::ingest(&store, &markup, &source)?
                }
                None => {
                    let fetcher = fetch::Fetcher::new(source.user_agent.as_deref())?;
                    pipeline::scrape(&store, &fetcher, &source)
                        .await
                        .context("Scrape aborted")?
                }
            };
            println!(
                "Inserted {} new records ({} already stored, {} errors).",
                report.inserted,
                report.skipped,
                report.errors.len()
            );
            if !report.is_clean() {
                for e in &report.errors {
                    println!("  - {}", e);
                }
            }
            println!("Done in {:.1}s", t0.elapsed().as_secs_f64());
        }
        Commands::List {
            saved,
            unsaved,
            json,
        } => {
            let store = open_store(&settings)?;
            let filter = RecordFilter {
                saved: match (saved, unsaved) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            };
            let records = store.list_records(filter)?;
            if json {
                print_json(&records)?;
            } else if records.is_empty() {
                println!("No records. Run 'scrape' first.");
            } else {
                for r in &records {
                    print_record_line(r);
                }
                println!("\n{} records", records.len());
            }
        }
        Commands::Show { id, json } => {
            let store = open_store(&settings)?;
            let full = store.get_record_with_note(id)?;
            if json {
                print_json(&full)?;
            } else {
                print_record_line(&full.record);
                match &full.note {
                    Some(note) => println!("\nNote #{} ({}):\n{}", note.id, note.created_at, note.body),
                    None => println!("\nNo note."),
                }
            }
        }
        Commands::Note { id, body } => {
            let store = open_store(&settings)?;
            let record = store.attach_note(id, &body.join(" "))?;
            println!(
                "Note #{} attached to record {}.",
                record.note_id.unwrap_or_default(),
                record.id
            );
        }
        Commands::NoteShow { id } => {
            let store = open_store(&settings)?;
            let note = store.get_note(id)?;
            println!("Note #{} ({}):\n{}", note.id, note.created_at, note.body);
        }
        Commands::Save { id } => {
            let store = open_store(&settings)?;
            let record = store.set_saved(id, true)?;
            println!("Saved: {}", record.title);
        }
        Commands::Unsave { id } => {
            let store = open_store(&settings)?;
            let record = store.set_saved(id, false)?;
            println!("Removed from saved: {}", record.title);
        }
        Commands::Stats => {
            let store = open_store(&settings)?;
            let s = store.stats()?;
            println!("Records:    {}", s.total);
            println!("Saved:      {}", s.saved);
            println!("With notes: {}", s.with_notes);
            println!("Notes:      {}", s.notes);
        }
    }

    Ok(())
}

fn open_store(settings: &config::Settings) -> anyhow::Result<Store> {
    Store::open(&settings.database_path)
        .with_context(|| format!("Failed to open {:?}", settings.database_path))
}

/// Validate the source before the database file is created.
fn scrape_setup(settings: &config::Settings) -> anyhow::Result<(config::Source, Store)> {
    let source = settings.source()?;
    let store = open_store(settings)?;
    Ok((source, store))
}

fn print_record_line(r: &Record) {
    let mark = if r.saved { "*" } else { " " };
    let note = if r.note_id.is_some() { " [note]" } else { "" };
    println!(
        "{:>4} {} {} | {}{}",
        r.id,
        mark,
        truncate(&r.title, 60),
        r.link,
        note
    );
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
