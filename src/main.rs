//! `mediapack`: export the media cache of a feed reader into a zip archive.

mod error;

use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use futures::StreamExt;
use mediapack_cache::{Database, OpenMode, Repository};
use mediapack_config::{Config, Overrides};
use mediapack_export::{Compression, ExportEvent, ExportOptions, ItemOutcome, ZipSink};
use mediapack_storage::BlobHandle;
use mediapack_storage::backend::LocalBlobStore;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Pack every cached media file into a zip archive, one folder per feed.
#[derive(Debug, Parser)]
#[command(name = "mediapack", version, about)]
struct Cli {
    /// Path of the zip archive to create (overwritten if it exists).
    output: PathBuf,
    /// Config file (TOML, YAML or JSON).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Cache database to read from.
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,
    /// Directory holding on-disk media files.
    #[arg(long, value_name = "DIR")]
    media_dir: Option<PathBuf>,
    /// Number of media records fetched per query.
    #[arg(long, value_name = "N")]
    page_size: Option<u64>,
    /// Compression of archive entries: stored or deflated.
    #[arg(long, value_name = "METHOD")]
    compression: Option<Compression>,
    /// Increase log verbosity (repeatable). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            database: self.database.clone(),
            media_root: self.media_dir.clone(),
            page_size: self.page_size,
            compression: self.compression,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref(), &cli.overrides()).or_raise(|| ErrorKind::Config)?;
    // The output is created before touching either store so a bad path fails
    // fast.
    let output = File::create(&cli.output).or_raise(|| ErrorKind::Output(cli.output.clone()))?;
    let sink = ZipSink::new(BufWriter::new(output), config.export.compression);

    let db = Database::open(&config.database, OpenMode::ExistingOnly)
        .await
        .or_raise(|| ErrorKind::Cache(config.database.clone()))?;
    let cache = Repository::from(&db);

    let root = std::path::absolute(&config.media.root).or_raise(|| ErrorKind::Storage(config.media.root.clone()))?;
    let blobs: BlobHandle = Arc::new(
        LocalBlobStore::new("media", &root, config.media.layout).or_raise(|| ErrorKind::Storage(root.clone()))?,
    );

    let options = ExportOptions { page_size: config.export.page_size };
    let result = report(mediapack_export::export(&cache, &blobs, sink, options)).await;
    db.close().await;
    result
}

/// Print progress for each event on stdout.
async fn report(events: impl futures::Stream<Item = mediapack_export::error::Result<ExportEvent>>) -> Result<()> {
    let mut events = std::pin::pin!(events);
    while let Some(event) = events.next().await {
        match event.or_raise(|| ErrorKind::Export)? {
            ExportEvent::Started(stat) => {
                println!("Packaging {} media files with total size of {} bytes.", stat.count, stat.total_size);
            },
            ExportEvent::Item { progress, outcome } => {
                let status = match &outcome {
                    ItemOutcome::Exported { .. } => "ok",
                    ItemOutcome::Skipped { reason, .. } => reason.as_str(),
                };
                println!("({}/{}) {}...{status}", progress.processed, progress.total, outcome.name());
            },
            ExportEvent::Complete(summary) => {
                tracing::info!(exported = summary.exported, skipped = summary.skipped, "archive written");
            },
        }
    }
    Ok(())
}
