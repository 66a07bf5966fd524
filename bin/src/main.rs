//! cambista CLI - P2P exchange-rate advertisement collector and resampler.

use anyhow::Result;
use cambista_lib::{Direction, Frequency, TimeRange};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod display;

use config::AppConfig;
use display::{Estimator, Format};

#[derive(Parser)]
#[command(name = "cambista")]
#[command(about = "P2P exchange-rate advertisement collector and resampler", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (default: ./cambista.yml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch current advertisements and store them as a new raw run
    Collect {
        /// Rebuild summaries after storing the run
        #[arg(long)]
        aggregate: bool,
    },

    /// Rebuild the summary store from all raw runs
    Aggregate {
        /// Frequencies to compute (repeatable; defaults to the configured list)
        #[arg(short, long)]
        frequency: Vec<Frequency>,

        /// Close estimator
        #[arg(short, long, value_enum)]
        estimator: Option<Estimator>,

        /// Restrict input records (day, week, year, all, or <start>..<end>)
        #[arg(short, long)]
        range: Option<TimeRange>,
    },

    /// Print stored buckets for an asset
    Query {
        /// Asset symbol (e.g., USDT)
        asset: String,

        /// Fiat currency filter (e.g., BOB)
        #[arg(long)]
        fiat: Option<String>,

        /// Bucket width (5min, 15min, 30min, 1h, 1D, 1W, 1month, 1year, or <n><unit>)
        #[arg(short, long, default_value = "1h")]
        frequency: Frequency,

        /// Direction filter (SELL, BUY; repeatable)
        #[arg(short, long)]
        direction: Vec<String>,

        /// Time window on bucket start (day, week, year, all, or <start>..<end>)
        #[arg(short, long, default_value = "all")]
        range: TimeRange,

        /// Require a specific close estimator
        #[arg(short, long, value_enum)]
        estimator: Option<Estimator>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: Format,
    },

    /// Show stored raw runs and summaries
    Status {
        /// List every raw run
        #[arg(long)]
        all: bool,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = AppConfig::load(cli.config.as_deref())?;
    debug!(config = %config.digest(), "configuration loaded");

    match command {
        Commands::Collect { aggregate } => {
            commands::collect::collect(&config, aggregate, cli.quiet).await
        }
        Commands::Aggregate {
            frequency,
            estimator,
            range,
        } => commands::aggregate::aggregate(&config, &frequency, estimator, range, cli.quiet),
        Commands::Query {
            asset,
            fiat,
            frequency,
            direction,
            range,
            estimator,
            format,
        } => {
            let args = commands::query::QueryArgs {
                asset,
                fiat,
                frequency,
                directions: direction.iter().map(|d| Direction::from(d.as_str())).collect(),
                range,
                estimator,
                format,
            };
            commands::query::query(&config, args, cli.quiet)
        }
        Commands::Status { all } => commands::status::status(&config, all),
    }
}
