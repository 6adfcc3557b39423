mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use graphmap_cli::logging::{init_logging, LoggingConfig};
use graphmap_cli::output::OutputFormat;
use graphmap_lib::{EngineConfig, RouteAlgorithm};

use crate::commands::{build, landmarks, route};

#[derive(Parser, Debug)]
#[command(author, version, about = "Road-network routing utilities")]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the graph artifact location.
    #[arg(long, global = true)]
    graph_cache: Option<PathBuf>,

    /// Raw JSON map used when the graph artifact is missing.
    #[arg(long, global = true)]
    raw: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the graph artifact from the raw map given with `--raw`.
    Build {
        /// Artifact path; defaults to the configured graph cache.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Select landmarks and save their distance table next to the graph.
    Landmarks {
        /// Number of landmarks; defaults to the configured count.
        #[arg(long)]
        count: Option<usize>,
        /// Regional center name used as a candidate (repeatable).
        #[arg(long = "center")]
        centers: Vec<String>,
        /// CSV of `name,lat,lon` rows resolving center names.
        #[arg(long)]
        places: Option<PathBuf>,
    },
    /// Compute a route through two or more points.
    Route {
        /// Point as `LAT,LON` (repeatable, in travel order).
        #[arg(
            long = "point",
            value_parser = route::parse_point,
            required = true,
            allow_hyphen_values = true
        )]
        points: Vec<(f64, f64)>,
        /// Search algorithm.
        #[arg(long, default_value_t = RouteAlgorithm::Alt)]
        algorithm: RouteAlgorithm,
        /// JSON file with threat polygons to avoid.
        #[arg(long)]
        threats: Option<PathBuf>,
        /// GeoNames CSV used to name the route points.
        #[arg(long)]
        settlements: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_logging(&LoggingConfig::from_env());
    let cli = Cli::parse();

    let context = match &cli.config {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration".to_string(),
    };
    let mut config = EngineConfig::load(cli.config.as_deref()).context(context)?;
    if let Some(path) = cli.graph_cache {
        config.graph_cache = Some(path);
    }
    if let Some(path) = cli.raw {
        config.raw_source = Some(path);
    }

    match cli.command {
        Command::Build { out } => {
            build::handle_build(&config, &build::BuildArgs { out }, cli.format)
        }
        Command::Landmarks {
            count,
            centers,
            places,
        } => landmarks::handle_landmarks(
            &config,
            &landmarks::LandmarkArgs {
                count,
                centers,
                places,
            },
            cli.format,
        ),
        Command::Route {
            points,
            algorithm,
            threats,
            settlements,
        } => route::handle_route(
            &config,
            &route::RouteArgs {
                points,
                algorithm,
                threats,
                settlements,
            },
            cli.format,
        ),
    }
}
