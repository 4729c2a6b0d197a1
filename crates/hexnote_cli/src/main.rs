//! Command-line front end for the hexnote journal.
//!
//! # Responsibility
//! - Load the JSON config, start file logging and open the journal database.
//! - Expose store operations (list, search, save, delete, tags) as
//!   subcommands that print one JSON document to stdout.

use clap::{Parser, Subcommand};
use hexnote_core::db::open_db;
use hexnote_core::{
    init_logging_from_config, load_or_init_config, AnnotationSnapshot, DisabledPublisher,
    EntryService, EntrySnapshot, SaveRequest, SqliteEntryRepository, TagService,
};
use log::info;
use serde_json::json;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "hexnote")]
#[command(about = "Journal store with inline #tag annotations")]
struct Cli {
    /// Config file; created with defaults when missing
    #[arg(long, env = "HEXNOTE_CONFIG", default_value = "hexnote.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check core linkage
    Ping,

    /// List entries, most recently updated first
    List,

    /// Case-sensitive substring search over entry HTML and tags
    Search {
        /// Text to look for; omit to list everything
        text: Option<String>,
    },

    /// Show one entry
    Show { id: i64 },

    /// Save an entry from HTML
    Save {
        /// Rendered HTML body
        html: String,

        /// Existing entry to update
        #[arg(long)]
        id: Option<i64>,

        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        #[arg(long, default_value = "")]
        title: String,

        /// Mark the entry public and publish it
        #[arg(long)]
        public: bool,
    },

    /// Delete an entry; unknown ids are ignored
    Delete { id: i64 },

    /// List registered tags
    Tags,

    /// Register a tag and apply it to every matching entry
    RegisterTag { tag: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("hexnote: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Commands::Ping = cli.command {
        println!(
            "{}",
            json!({ "ping": hexnote_core::ping(), "version": hexnote_core::core_version() })
        );
        return Ok(());
    }

    let config = load_or_init_config(&cli.config)?;
    init_logging_from_config(&config.logging)?;
    let base_dir = cli
        .config
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let db_path = config.resolved_db_path(base_dir);
    let mut conn = open_db(&db_path)?;
    info!(
        "event=cli_start module=cli status=ok db_path={}",
        db_path.display()
    );

    let repo = SqliteEntryRepository::try_new(&mut conn)?;
    match cli.command {
        Commands::Ping => {}
        Commands::List => {
            let service = EntryService::new(repo, DisabledPublisher);
            print_json(&service.search(None)?)?;
        }
        Commands::Search { text } => {
            let service = EntryService::new(repo, DisabledPublisher);
            print_json(&service.search(text.as_deref())?)?;
        }
        Commands::Show { id } => {
            let service = EntryService::new(repo, DisabledPublisher);
            print_json(&service.get_by_id(id)?)?;
        }
        Commands::Save {
            html,
            id,
            tags,
            title,
            public,
        } => {
            let mut service = EntryService::new(repo, DisabledPublisher);
            let outcome = service.save(SaveRequest {
                id,
                content: json!({ "ops": [{ "insert": html.clone() }] }),
                html,
                annotations: AnnotationSnapshot {
                    tags,
                    title,
                    public,
                },
                public,
            })?;
            if let Some(err) = &outcome.publish_error {
                eprintln!("hexnote: entry {} saved, publish failed: {err}", outcome.entry.id);
            }
            print_json(&json!({
                "created": outcome.created,
                "entry": EntrySnapshot::from(&outcome.entry),
            }))?;
        }
        Commands::Delete { id } => {
            let mut service = EntryService::new(repo, DisabledPublisher);
            let existed = service.delete(id)?;
            print_json(&json!({ "id": id, "existed": existed }))?;
        }
        Commands::Tags => {
            let service = TagService::new(repo);
            print_json(&service.list_tags()?)?;
        }
        Commands::RegisterTag { tag } => {
            let mut service = TagService::new(repo);
            let report = service.register_tag(&tag)?;
            print_json(&json!({
                "tag": report.registration.record,
                "created": report.registration.created,
                "matched": report.matched,
                "newlyTagged": report.newly_tagged,
                "skipped": report.skipped,
            }))?;
        }
    }
    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
