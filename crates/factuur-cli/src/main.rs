use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use factuur_core::{
    Config, ExtractionGateway, MAX_DOCUMENT_BYTES, content_type_for_extension,
    is_supported_extension,
};
use factuur_store::{InvoiceStore, NewInvoice};
use tracing_subscriber::EnvFilter;

mod output;

use output::ColorMode;

/// Factuur - extract invoice fields with Azure AI Document Intelligence
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract fields from a PDF or image invoice and print them as JSON
    Extract {
        /// Path to the invoice (.pdf, .png, .jpg, .jpeg)
        file_path: PathBuf,

        /// Free-form notes to attach to the record
        #[arg(long, default_value = "")]
        notes: String,

        /// Also append the record to the invoice store
        #[arg(long)]
        save: bool,

        /// Path to the SQLite invoice store (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// List stored invoices, newest first
    List {
        /// Path to the SQLite invoice store (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Maximum number of rows to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Print rows as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Command::Extract {
            file_path,
            notes,
            save,
            db,
        } => extract(&config, &file_path, notes, save, db).await,
        Command::List {
            db,
            limit,
            json,
            no_color,
        } => list(&config, db, limit, json, ColorMode(!no_color)),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn extract(
    config: &Config,
    file_path: &Path,
    notes: String,
    save: bool,
    db: Option<PathBuf>,
) -> anyhow::Result<()> {
    let extension = file_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if !is_supported_extension(extension) {
        bail!(
            "Unsupported file type: {}",
            if extension.is_empty() {
                "unknown".to_string()
            } else {
                format!(".{}", extension.to_ascii_lowercase())
            }
        );
    }

    let data = std::fs::read(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    if data.len() > MAX_DOCUMENT_BYTES {
        bail!(
            "File too large (max {} MiB)",
            MAX_DOCUMENT_BYTES / (1024 * 1024)
        );
    }

    let gateway = ExtractionGateway::from_config(config, reqwest::Client::new());
    let mut record = gateway
        .extract(&data, content_type_for_extension(extension))
        .await
        .context("Extraction failed")?;
    record.notes = notes;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &record)?;
    writeln!(out)?;

    if save {
        let path = db.unwrap_or_else(|| config.database_path.clone());
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let store = InvoiceStore::open(&path)?;
        let id = store.insert(&NewInvoice::from_record(file_name, &record))?;
        eprintln!("Saved as #{} in {}", id, path.display());
    }

    Ok(())
}

fn list(
    config: &Config,
    db: Option<PathBuf>,
    limit: Option<usize>,
    json: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    let path = db.unwrap_or_else(|| config.database_path.clone());
    let store = InvoiceStore::open(&path)
        .with_context(|| format!("Failed to open invoice store at {}", path.display()))?;
    let rows = store.list(limit)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &rows)?;
        writeln!(out)?;
    } else {
        output::print_invoices(&mut out, &rows, color)?;
    }
    Ok(())
}
