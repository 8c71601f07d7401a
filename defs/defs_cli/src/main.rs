use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use defs_core::utils::LogLevel;
use defs_runtime::{Runtime, RuntimeConfig};
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::definition::{CreateArgs, ShowArgs};
use commands::execution::RunArgs;

/// Defs Command Line Interface
///
/// Create, inspect and run content-addressed function definitions.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Directory definitions are stored in
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the configuration
    #[clap(long, global = true)]
    log_level: Option<LogLevel>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize and store a definition, printing its id
    Create(CreateArgs),

    /// Execute a definition by name or id, printing its result
    Run(RunArgs),

    /// Print a stored definition as JSON
    Show(ShowArgs),

    /// List name aliases
    Names,
}

const DEFAULT_DATA_DIR: &str = ".defs";

fn subscriber(level: LogLevel) -> impl tracing::Subscriber + Send + Sync + 'static {
    FmtSubscriber::builder()
        .with_max_level(level.to_tracing_level())
        .with_writer(std::io::stderr)
        .finish()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The configured level is not known yet while the configuration loads
    let config = {
        let _guard = tracing::subscriber::set_default(subscriber(
            cli.log_level.unwrap_or(LogLevel::Warning),
        ));
        RuntimeConfig::load(cli.config.as_deref())
            .await
            .context("Failed to load configuration")?
    };
    let _ = tracing::subscriber::set_global_default(subscriber(
        cli.log_level.unwrap_or(config.logging.level),
    ));

    let data_dir = cli
        .data_dir
        .or_else(|| config.storage.path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    debug!("Using data directory {}", data_dir.display());

    let runtime = Runtime::new(config.with_file_storage(data_dir))
        .context("Failed to initialize the defs runtime")?;

    match cli.command {
        Commands::Create(args) => commands::definition::execute_create(&runtime, &args).await,
        Commands::Run(args) => commands::execution::execute_run(&runtime, &args).await,
        Commands::Show(args) => commands::definition::execute_show(&runtime, &args).await,
        Commands::Names => commands::definition::execute_names(&runtime).await,
    }
}
