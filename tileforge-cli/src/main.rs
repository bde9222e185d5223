//! TileForge CLI - Command-line interface
//!
//! This binary provides a command-line interface to the TileForge library:
//! searching and ordering imagery for a set of targets, then cutting the
//! delivered scenes into training samples.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::acquire::{self, OrderArgs};
use commands::samples::{self, SampleArgs};
use error::CliError;
use runner::CliRunner;

/// Default configuration file path.
const DEFAULT_CONFIG_PATH: &str = "config.ini";

/// Default dataset identifier.
const DEFAULT_DATASET_ID: &str = "default";

#[derive(Parser)]
#[command(name = "tileforge")]
#[command(version = tileforge::VERSION)]
#[command(about = "Build satellite-imagery training datasets", long_about = None)]
struct Cli {
    /// Configuration file (defaults apply when missing)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Root directory for datasets (overrides [storage] data_dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Dataset identifier; each run gets a timestamped directory below it
    #[arg(long, global = true, default_value = DEFAULT_DATASET_ID)]
    id: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog for every target and write the order manifest
    Search {
        /// Directory of target collections (overrides [storage] targets_dir)
        #[arg(long)]
        targets: Option<PathBuf>,
    },

    /// Submit the orders of an order manifest
    Order {
        /// Order manifest written by `search`
        #[arg(long)]
        manifest: PathBuf,

        /// Response manifest of an earlier run; its orders are not resubmitted
        #[arg(long)]
        resume: Option<PathBuf>,
    },

    /// Search, then order everything found
    GetImagery {
        /// Directory of target collections (overrides [storage] targets_dir)
        #[arg(long)]
        targets: Option<PathBuf>,
    },

    /// Cut delivered scenes into tile samples
    PrepareSamples {
        /// Order manifest naming the scenes
        #[arg(long)]
        manifest: PathBuf,

        /// Directory holding the delivered rasters
        #[arg(long)]
        src_dir: PathBuf,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    let runner = CliRunner::new(&cli.config, cli.data_dir, &cli.id)?;

    match cli.command {
        Commands::Search { targets } => acquire::run_search(&runner, targets),
        Commands::Order { manifest, resume } => {
            acquire::run_order(&runner, OrderArgs { manifest, resume })
        }
        Commands::GetImagery { targets } => acquire::run_get_imagery(&runner, targets),
        Commands::PrepareSamples { manifest, src_dir } => {
            samples::run(&runner, SampleArgs { manifest, src_dir })
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "Command failed");
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_order_with_resume() {
        let cli = Cli::try_parse_from([
            "tileforge",
            "--id",
            "kilns",
            "order",
            "--manifest",
            "run/data/order_manifest.json",
            "--resume",
            "old/order_responses.json",
        ])
        .unwrap();

        assert_eq!(cli.id, "kilns");
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        match cli.command {
            Commands::Order { manifest, resume } => {
                assert_eq!(manifest, PathBuf::from("run/data/order_manifest.json"));
                assert_eq!(resume, Some(PathBuf::from("old/order_responses.json")));
            }
            _ => panic!("expected order command"),
        }
    }

    #[test]
    fn test_prepare_samples_requires_src_dir() {
        let result = Cli::try_parse_from([
            "tileforge",
            "prepare-samples",
            "--manifest",
            "order_manifest.json",
        ]);
        assert!(result.is_err());
    }
}
