mod outline;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use featdoc_config::Config;
use featdoc_fs::{FeatureFileLoader, FileSystem, LoadError, LoadOptions, TextParser};
use outline::OutlineParser;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "featdoc",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inspect the encoding and outline of feature files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (searched in the usual locations if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the encoding detected from each file's byte order mark
    Detect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Decode each file and print its feature title and scenario count
    Outline {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("featdoc={log_level},featdoc_fs={log_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to read configuration '{}'", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };
    let options = LoadOptions::default()
        .with_fallback_label(&config.loader.fallback_encoding)?
        .with_buffer_size(config.loader.buffer_size);
    let loader = FeatureFileLoader::with_parser(OutlineParser).with_options(options);

    let (total, failed) = match &cli.command {
        Commands::Detect { files } => (files.len(), detect(&loader, files)),
        Commands::Outline { files } => (files.len(), outline(&loader, files)),
    };

    info!(total, failed, "done");
    if failed > 0 {
        anyhow::bail!("{failed} of {total} file(s) failed");
    }
    Ok(())
}

fn detect<P, F>(loader: &FeatureFileLoader<P, F>, files: &[PathBuf]) -> usize
where
    P: TextParser,
    F: FileSystem,
{
    let mut failed = 0;
    for path in files {
        match loader.detect_encoding(path) {
            Ok(tag) => println!("{}: {}", path.display(), tag),
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                failed += 1;
            }
        }
    }
    failed
}

fn outline<F: FileSystem>(
    loader: &FeatureFileLoader<OutlineParser, F>,
    files: &[PathBuf],
) -> usize {
    let mut failed = 0;
    for path in files {
        match loader.load(path) {
            Ok(outline) => println!(
                "{}: {} ({} scenarios, {} lines)",
                path.display(),
                outline.title,
                outline.scenarios,
                outline.lines
            ),
            Err(e) => {
                report(path, &e);
                failed += 1;
            }
        }
    }
    failed
}

fn report(path: &Path, err: &LoadError) {
    match err {
        // Already names the file.
        LoadError::Parse(parse) => eprintln!("{}", parse),
        _ => eprintln!("{}: {}", path.display(), err),
    }
}
