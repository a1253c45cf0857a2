mod platform;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use sorter_core::Mode;

use platform::config::{AppConfig, CliOverrides, LogTarget, DEFAULT_CONFIG_FILENAME};

const LOG_FILENAME: &str = "sorter.log";

/// Upload a directory of product images for classification and approve the
/// backend's predictions.
#[derive(Parser, Debug)]
#[command(name = "sorter")]
#[command(version)]
struct Cli {
    /// Directory of product images to upload
    directory: PathBuf,

    /// Config file (RON). Defaults to ./sorter.ron when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend socket URL
    #[arg(long)]
    server: Option<String>,

    /// Base URL uploaded images are served from
    #[arg(long)]
    images: Option<String>,

    /// automatic, semi-automatic or manual
    #[arg(long)]
    mode: Option<Mode>,

    /// Directory the predictions CSV is written to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Upper bound on concurrent file reads (unbounded when omitted)
    #[arg(long = "max-reads")]
    max_reads: Option<usize>,

    /// Fetch image previews for approval requests
    #[arg(long)]
    previews: bool,

    /// Where log output goes
    #[arg(long, value_enum)]
    log: Option<LogTarget>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            server_url: self.server.clone(),
            image_base_url: self.images.clone(),
            mode: self.mode,
            output_dir: self.output.clone(),
            max_concurrent_reads: self.max_reads,
            fetch_previews: self.previews,
            log_destination: self.log,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config_path, required) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILENAME), false),
    };
    let mut config = AppConfig::load(&config_path, required)?;
    config.apply(cli.overrides());

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if !engine_logging::initialize(config.log_destination.into(), level, Path::new(LOG_FILENAME)) {
        eprintln!("Warning: logging is disabled");
    }

    platform::run(config, &cli.directory)
        .await
        .context("Sorting run failed")
}
