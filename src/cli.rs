use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gardencal",
    version,
    about = "Planting calendar built from climate normals and live forecasts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override data directory (input CSVs and SQLite store)
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
    /// Validate config, input files and provider connections
    Check,
    /// Refresh input CSVs from the weather providers
    Ingest {
        #[arg(value_enum)]
        target: IngestTarget,

        /// Calendar year for sun times (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Run the pipeline and publish the derived tables
    Run,
    /// Ingest recent weather, then run the pipeline
    Refresh,
    /// Print the published calendar
    Report {
        /// Limit the report to one city
        #[arg(long)]
        city: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IngestTarget {
    /// Trailing days and forecast
    Recent,
    /// Daily archive since the configured start date
    Historical,
    /// Sunrise, sunset and twilight for one year
    Sun,
}
