mod collect;
mod output;
mod progress;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::MultiProgress;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use brewdb_core::{AppConfig, SourceId};

use crate::progress::BarWriter;

#[derive(Debug, Parser)]
#[command(name = "brewdb-cli")]
#[command(about = "Collect beer listings from Australian liquor storefronts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape the configured sources and write the merged catalog as JSON
    Collect(CollectArgs),
    /// List the configured sources and whether each is enabled
    Sources,
}

#[derive(Debug, Args, PartialEq, Eq)]
pub(crate) struct CollectArgs {
    /// Only scrape this source (repeatable); runs it even if disabled in the sources file
    #[arg(long = "source", value_name = "NAME")]
    pub sources: Vec<SourceId>,

    /// Output file (defaults to BREWDB_OUTPUT_PATH)
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Keep the products already in the output file and skip them while scraping
    #[arg(long)]
    pub resume: bool,

    /// Print which sources would run without fetching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Cancel every source after this many seconds (overrides BREWDB_RUN_TIMEOUT_SECS)
    #[arg(long, value_name = "N")]
    pub timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = brewdb_core::load_app_config().context("invalid configuration")?;
    let bars = MultiProgress::new();
    // Flushes the file log on drop.
    let _log_guard = init_tracing(&config, &bars)?;

    match cli.command {
        Commands::Collect(args) => collect::run_collect(&config, &args, &bars).await,
        Commands::Sources => {
            collect::list_sources(&config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Console layer on stderr (drawn around the progress bars) plus an optional
/// plain-text file layer written from a background thread, both behind the
/// same level filter. `RUST_LOG` wins over `BREWDB_LOG_LEVEL`.
///
/// The returned guard must live until exit or buffered file lines are lost.
fn init_tracing(config: &AppConfig, bars: &MultiProgress) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("invalid log level '{}'", config.log_level))?;

    let console_layer = fmt::layer()
        .with_writer(BarWriter::new(bars))
        .with_target(false);

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let appender = file_appender(path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(guard)
}

/// Appends to `path`, never rotating. The directory is created if missing.
fn file_appender(path: &Path) -> anyhow::Result<RollingFileAppender> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("log file path {} has no file name", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .with_context(|| format!("failed to open log file {}", path.display()))
}
