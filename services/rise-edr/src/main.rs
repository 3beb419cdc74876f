//! RISE EDR command-line service
//!
//! Serves EDR items and coverage documents for USBR RISE locations from a
//! snapshot of previously fetched RISE responses.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use rise_edr::commands::{self, ItemsArgs};
use rise_edr::config::RiseConfig;
use rise_edr::source::FileSource;
use rise_protocol::{media_types, RiseError};

/// RISE EDR service
#[derive(Parser, Debug)]
#[command(name = "rise-edr")]
#[command(about = "EDR GeoJSON and CoverageJSON output for USBR RISE locations")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "rise-edr.yaml", env = "RISE_EDR_CONFIG")]
    config: PathBuf,

    /// Snapshot directory (overrides the config file)
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Locations matching the filters, as a FeatureCollection
    Items(ItemsArgs),

    /// A single location, as a Feature
    Item {
        /// Location `_id`
        id: i64,

        #[arg(long)]
        skip_geometry: bool,
    },

    /// Locations joined with time series, as a CoverageCollection
    Coverage {
        /// JSON file with a list of locations and their parameter results
        results: PathBuf,
    },

    /// The filterable fields and their types
    Fields,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!("Starting RISE EDR");

    let mut config = RiseConfig::load(&args.config)?;
    if let Some(dir) = args.snapshot_dir {
        config = config.with_snapshot_dir(dir);
    }
    info!("Using snapshot directory {:?}", config.snapshot_dir);

    let source = FileSource::new(config.snapshot_dir.clone());

    let result = match &args.command {
        Command::Items(items) => commands::items(&source, &config, items)
            .await
            .and_then(|out| to_pretty(&out))
            .map(|body| (body, media_types::GEO_JSON)),
        Command::Item { id, skip_geometry } => commands::item(&source, &config, *id, *skip_geometry)
            .await
            .and_then(|out| to_pretty(&out))
            .map(|body| (body, media_types::GEO_JSON)),
        Command::Coverage { results } => commands::coverage(&source, results)
            .await
            .and_then(|out| to_pretty(&out))
            .map(|body| (body, media_types::COVERAGE_JSON)),
        Command::Fields => commands::fields(&config)
            .and_then(|out| to_pretty(&out))
            .map(|body| (body, media_types::JSON)),
    };

    match result {
        Ok((body, media_type)) => {
            info!("Writing {} document ({} bytes)", media_type, body.len());
            println!("{}", body);
            Ok(())
        }
        Err(e) => match e.downcast_ref::<RiseError>() {
            Some(rise) => {
                tracing::error!("Request failed: {}", rise);
                eprintln!("{}", to_pretty(&rise.to_exception())?);
                std::process::exit(if rise.is_query_error() { 2 } else { 1 });
            }
            None => Err(e),
        },
    }
}

fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
