//! Inspection CLI for the pageprint engine: load a serialized DOM
//! snapshot, run the scanner over it, and print the results as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pageprint::{EngineConfig, Page, SnapshotDocument};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pageprint", about = "Inspect DOM snapshots with the pageprint engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a snapshot and print the fingerprint batch
    Scan {
        /// Path to the snapshot JSON file
        snapshot: PathBuf,
        /// Optional engine config JSON (heuristic tables and thresholds)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
    /// List iframes found in a snapshot
    Frames {
        snapshot: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// List next-page controls found in a snapshot
    Pagination {
        snapshot: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Scan {
            snapshot,
            config,
            pretty,
        } => {
            let page = load_page(&snapshot, config.as_deref())?;
            let outcome = page.scan_page();
            print_json(&outcome, pretty)
        }
        Command::Frames { snapshot, pretty } => {
            let page = load_page(&snapshot, None)?;
            print_json(&page.list_frames(), pretty)
        }
        Command::Pagination { snapshot, pretty } => {
            let page = load_page(&snapshot, None)?;
            print_json(&page.find_pagination_controls(), pretty)
        }
    }
}

fn load_page(snapshot_path: &Path, config_path: Option<&Path>) -> Result<Page> {
    let raw = fs::read_to_string(snapshot_path)
        .with_context(|| format!("reading snapshot {}", snapshot_path.display()))?;
    let doc = SnapshotDocument::from_json(&raw)
        .with_context(|| format!("parsing snapshot {}", snapshot_path.display()))?;

    let config = match config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<EngineConfig>(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    Ok(Page::with_config(doc.as_document(), config))
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
