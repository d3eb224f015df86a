//! News Ingestor — Binary Entrypoint
//! Runs one ingest pass over a source family and exits. Exit status is
//! zero when the run completed; per-item failures stay in the run report.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_ingestor::feeds::render::ChromeRenderer;
use news_ingestor::store::sqlite::SqliteStore;
use news_ingestor::{IngestConfig, Ingestor};

#[derive(Parser)]
#[command(
    name = "news-ingestor",
    about = "Ingest news from API providers and RSS/Atom feeds into the canonical record store."
)]
struct Cli {
    /// Path to the ingestor TOML config (overrides NEWS_INGESTOR_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch from every enabled API provider, one unit per keyword.
    Providers,
    /// Poll every enabled RSS/Atom feed.
    Feeds,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_ingestor=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op elsewhere.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    // Anything that fails from here until the run starts is a fatal
    // configuration problem and exits non-zero.
    let cfg = match &cli.config {
        Some(path) => IngestConfig::load_from(path)?,
        None => IngestConfig::load_default()?,
    };
    let store = Arc::new(SqliteStore::connect(&cfg.database_url).await?);
    let renderer = Arc::new(ChromeRenderer::new());
    let ingestor = Ingestor::new(cfg, store.clone(), store, renderer)?;

    let report = match cli.command {
        Command::Providers => ingestor.run_providers().await?,
        Command::Feeds => ingestor.run_feeds().await?,
    };
    report.log();

    Ok(())
}
