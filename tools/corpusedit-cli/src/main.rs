//! corpusedit CLI: browse, edit, and save a sharded speech corpus.
//!
//! Usage:
//!   corpusedit files                        List the source shards
//!   corpusedit info [FILES..]               Load shards and summarize them
//!   corpusedit show <N> [FILES..]           Print sample N (1-based)
//!   corpusedit edit [FILES..]               Edit interactively over stdin
//!   corpusedit apply --script S [FILES..]   Apply a JSON edit script and save

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use corpusedit_common::config::{AppConfig, LoggingConfig};

mod commands;
mod session;

#[derive(Parser)]
#[command(
    name = "corpusedit",
    about = "Audio and transcript editor for Parquet speech corpora",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Corpus root holding the input and output subdirectories
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file to use instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the shards available for loading
    Files,

    /// Load shards and print per-shard row counts
    Info {
        /// Shard file names; all shards when omitted
        files: Vec<String>,
    },

    /// Print one sample
    Show {
        /// Sample number (1-based)
        index: usize,

        /// Shard file names; all shards when omitted
        files: Vec<String>,

        /// Print the sample as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit samples interactively, reading commands from stdin
    Edit {
        /// Shard file names; all shards when omitted
        files: Vec<String>,
    },

    /// Apply a JSON array of edit operations, then save
    Apply {
        /// Path to the edit script
        #[arg(short, long)]
        script: PathBuf,

        /// Shard file names; all shards when omitted
        files: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    corpusedit_common::logging::init_logging(&LoggingConfig {
        level,
        json: config.logging.json,
    });
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    match cli.command {
        Commands::Files => commands::files::run(&config),
        Commands::Info { files } => commands::info::run(&config, &files),
        Commands::Show { index, files, json } => commands::show::run(&config, index, &files, json),
        Commands::Edit { files } => commands::edit::run(&config, &files),
        Commands::Apply { script, files } => commands::apply::run(&config, script, &files),
    }
}
