//! # lead-ingest CLI
//!
//! Bulk-loads people-data CSV exports into a vector collection.
//!
//! ## Usage
//!
//! ```bash
//! lead-ingest --config ./config/lead-ingest.toml [command]
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lead-ingest` / `lead-ingest upload` | Upload every CSV file not yet checkpointed |
//! | `lead-ingest scan` | List input files and their checkpoint status |
//! | `lead-ingest validate` | Parse and validate every file, no network |
//! | `lead-ingest checkpoint stats\|list\|clear` | Inspect or reset checkpoints |
//! | `lead-ingest search "<query>"` | Semantic search over uploaded people |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `lead_ingest=info`).

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lead_ingest::progress::ProgressMode;
use lead_ingest::{config, inspect, search, upload};

/// lead-ingest: resumable CSV → embeddings → vector collection loader.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/lead-ingest.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "lead-ingest",
    about = "Resumable bulk loader for people-data CSV exports",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lead-ingest.toml`; built-in defaults are used
    /// when that file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Progress output on stderr. Defaults to `human` on a terminal and
    /// `off` otherwise.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressArg>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProgressArg {
    Off,
    Human,
    Json,
}

impl From<ProgressArg> for ProgressMode {
    fn from(arg: ProgressArg) -> Self {
        match arg {
            ProgressArg::Off => ProgressMode::Off,
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Upload every CSV file under the input root that is not yet
    /// checkpointed. This is the default command.
    Upload,

    /// List input files and whether each is already uploaded.
    Scan,

    /// Parse and validate every input file without uploading anything.
    Validate,

    /// Inspect or reset the upload checkpoint.
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },

    /// Semantic search over uploaded people.
    Search {
        /// Free-text query, e.g. "rust engineers in berlin".
        query: String,

        /// Maximum number of results.
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Rerank candidates with the configured reranker.
        #[arg(long)]
        rerank: bool,
    },
}

#[derive(Subcommand)]
enum CheckpointAction {
    /// Number of uploaded files and last update time.
    Stats,
    /// Print every uploaded file path.
    List,
    /// Forget every uploaded file so the next run starts over.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lead_ingest=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cfg = config::load_or_default(cli.config.as_deref())?;
    let progress = cli
        .progress
        .map(ProgressMode::from)
        .unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command.unwrap_or(Commands::Upload) {
        Commands::Upload => upload::run_upload(&cfg, progress).await?,
        Commands::Scan => inspect::run_scan(&cfg).await?,
        Commands::Validate => inspect::run_validate(&cfg).await?,
        Commands::Checkpoint { action } => match action {
            CheckpointAction::Stats => inspect::run_checkpoint_stats(&cfg).await?,
            CheckpointAction::List => inspect::run_checkpoint_list(&cfg).await?,
            CheckpointAction::Clear => inspect::run_checkpoint_clear(&cfg).await?,
        },
        Commands::Search {
            query,
            limit,
            rerank,
        } => search::run_search(&cfg, &query, limit, rerank).await?,
    }

    Ok(())
}
