//! ribbon - command line front end for the insight pipeline core
//!
//! Runs the pipeline over exported records, exercises invalidation and
//! classification, and prints the effective configuration.

mod cli;

use clap::{Parser, Subcommand};
use ribbon_core::error::Result;
use ribbon_core::RibbonConfig;
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ribbon")]
#[command(about = "Insight pipeline with quality ribbons", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// TOML config file (RIBBON_* environment variables still override it)
    #[arg(short, long, env = "RIBBON_CONFIG")]
    config: Option<PathBuf>,

    /// Keep the cache in memory instead of the default SQLite file
    #[arg(long)]
    in_memory: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a JSON array of records and print the result
    Process {
        /// User the records belong to
        #[arg(short, long)]
        user: String,

        /// Domain to analyze (mood, cbt, tracking, ocd, aggregate)
        #[arg(short, long)]
        domain: String,

        /// JSON file with the records, or - for stdin
        #[arg(short, long)]
        records: PathBuf,

        /// Fall back to a heuristic result if analysis fails
        #[arg(long)]
        degrade: bool,

        /// Also run the suggestion selector on the result
        #[arg(long)]
        suggest: bool,
    },

    /// Invalidate cached results after a data change
    Invalidate {
        #[arg(short, long)]
        user: String,

        /// Event (mood_added, cbt_record_added, compulsion_added,
        /// ocd_pattern_added, manual_refresh, data_cleared)
        #[arg(short, long)]
        event: String,
    },

    /// Classify a sample size for a domain
    Classify {
        #[arg(short, long)]
        domain: String,

        #[arg(short = 'n', long)]
        sample_size: u32,

        #[arg(long, default_value = "0.5")]
        confidence: f64,

        #[arg(long, default_value = "0.5")]
        data_quality: f64,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let level = level.as_str().to_lowercase();
    let filter = EnvFilter::new(format!("ribbon_core={},ribbon={}", level, level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("ribbon v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = RibbonConfig::load(cli.config.as_deref())?;
    if config.database_path.is_none() && !cli.in_memory {
        config.database_path = Some(cli::default_db_path());
    }
    debug!("Cache database: {:?}", config.database_path);

    match cli.command {
        Commands::Process {
            user,
            domain,
            records,
            degrade,
            suggest,
        } => cli::process::handle(config, user, domain, records, degrade, suggest).await,
        Commands::Invalidate { user, event } => cli::invalidate::handle(config, user, event).await,
        Commands::Classify {
            domain,
            sample_size,
            confidence,
            data_quality,
        } => cli::classify::handle(domain, sample_size, confidence, data_quality),
        Commands::Config => cli::config::handle(&config),
    }
}
