use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use image_localizer::config::{Config, DEFAULT_CONFIG_FILE};
use image_localizer::fetcher::http::HttpFetcher;
use image_localizer::logging::init_logging;
use image_localizer::rewriter::RewriteOptions;
use image_localizer::run::run;
use tracing::info;

/// Download externally hosted images referenced from JS/TS sources and
/// point the source literals at the local copies.
#[derive(Parser, Debug)]
#[command(name = "image-localizer", version, about)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Directory to scan for source files.
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Directory downloaded images are written to.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Web path prefix for rewritten literals.
    #[arg(long)]
    url_prefix: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Report what would change without downloading or writing.
    #[arg(long)]
    dry_run: bool,

    /// Download again even if the image file already exists.
    #[arg(long)]
    force: bool,

    /// Show a progress bar for each download.
    #[arg(long)]
    progress: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.source_dir {
            config.source_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(prefix) = &self.url_prefix {
            config.url_prefix = prefix.clone();
        }
        if let Some(secs) = self.timeout {
            config.fetch.timeout_secs = secs;
        }
        if self.progress {
            config.fetch.progress = true;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // 1. Load config
    let mut config = Config::load(&cli.config)?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    // 2. Init fetcher
    let fetcher = HttpFetcher::new(&config.fetch)?;

    // 3. Run
    info!("Scanning {}", config.source_dir.display());
    let options = RewriteOptions {
        dry_run: cli.dry_run,
        force: cli.force,
    };
    let summary = run(&config, &fetcher, options)?;

    println!("\n{summary}");
    Ok(())
}
