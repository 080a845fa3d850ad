use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::ServiceOptions;

/// GeoTIFF elevation lookup tool
#[derive(Parser)]
#[command(name = "geoelev")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing .tif tiles
    #[arg(short, long, env = "GEOELEV_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Summary JSON path (default: <data-dir>/summary.json)
    #[arg(short, long, env = "GEOELEV_SUMMARY_FILE", global = true)]
    summary: Option<PathBuf>,

    /// Maximum tiles open at once
    #[arg(
        long,
        env = "GEOELEV_OPEN_HANDLES",
        default_value_t = geoelev::DEFAULT_OPEN_HANDLES,
        global = true
    )]
    open_handles: usize,

    /// Load every tile into memory (WGS84 tiles only)
    #[arg(long, global = true)]
    cache_all: bool,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the data directory and write the summary JSON
    Summary {
        /// Rebuild even if the summary already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Query elevation for a single coordinate
    Query {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add an elevation column to a CSV of coordinates
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: <input>_elevation.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column name for latitude
        #[arg(long, default_value = "lat")]
        lat_col: String,

        /// Column name for longitude
        #[arg(long, default_value = "lng")]
        lng_col: String,
    },

    /// Display information about a GeoTIFF tile
    Info {
        /// Path to a .tif file
        tile: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = ServiceOptions {
        data_dir: cli.data_dir,
        summary: cli.summary,
        open_handles: cli.open_handles,
        cache_all: cli.cache_all,
    };

    match cli.command {
        Commands::Summary { force } => commands::summary::run(&options, force),
        Commands::Query { lat, lng, json } => commands::query::run(&options, lat, lng, json),
        Commands::Batch {
            input,
            output,
            lat_col,
            lng_col,
        } => commands::batch::run(&options, input, output, &lat_col, &lng_col),
        Commands::Info { tile } => commands::info::run(tile),
    }
}
