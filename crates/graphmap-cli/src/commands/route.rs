//! Route command handler for computing paths between coordinates.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use graphmap_lib::{
    annotate_route, landmark_table_path, load_graph, EngineConfig, Graph, LandmarkTable,
    RouteAlgorithm, RouteRequest, RoutingEngine, SettlementTable, ThreatPolygon,
};

use crate::commands::landmarks::build_from_all_nodes;
use graphmap_cli::output::{write_route, OutputFormat};
use graphmap_cli::terminal::ColorPalette;

/// Arguments for the route command.
#[derive(Debug, Clone)]
pub struct RouteArgs {
    /// `(lat, lon)` points in travel order.
    pub points: Vec<(f64, f64)>,
    pub algorithm: RouteAlgorithm,
    /// JSON file holding an array of threat polygons.
    pub threats: Option<PathBuf>,
    pub settlements: Option<PathBuf>,
}

/// Parse a `LAT,LON` pair.
pub fn parse_point(value: &str) -> std::result::Result<(f64, f64), String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON but got '{value}'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude '{lon}': {e}"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("point ({lat}, {lon}) is out of range"));
    }
    Ok((lat, lon))
}

pub fn handle_route(config: &EngineConfig, args: &RouteArgs, format: OutputFormat) -> Result<()> {
    let source = config.graph_source()?;
    let graph = load_graph(&source)
        .with_context(|| format!("failed to load graph from {}", source.cache.display()))?;

    let table = match args.algorithm {
        RouteAlgorithm::Alt => {
            let table_path = landmark_table_path(&source.cache);
            load_landmarks(&graph, &table_path, config.landmark_count)?
        }
        RouteAlgorithm::Dijkstra => LandmarkTable::empty(),
    };

    let threats = match &args.threats {
        Some(path) => load_threats(path)?,
        None => Vec::new(),
    };

    let engine = RoutingEngine::new(Arc::new(graph), Arc::new(table));
    let request = RouteRequest::new(args.points.clone())
        .with_algorithm(args.algorithm)
        .with_threats(threats);

    let mut response = match engine.compute_route(&request) {
        Ok(response) => response,
        Err(err) if err.is_unreachable() => {
            return Err(anyhow::Error::new(err).context(
                "No route found. Try moving the points or removing threat zones.",
            ))
        }
        Err(err) => return Err(err.into()),
    };

    if let Some(path) = args.settlements.as_deref().or(config.settlements_file.as_deref()) {
        let settlements = SettlementTable::from_path(path)
            .with_context(|| format!("failed to read settlements from {}", path.display()))?;
        annotate_route(&mut response, &settlements, config.settlement_radius_m);
    }

    write_route(
        &mut io::stdout().lock(),
        &response,
        format,
        &ColorPalette::detect(),
    )
}

/// Landmark table saved next to the graph, rebuilt in memory when missing or
/// built for a different graph.
fn load_landmarks(graph: &Graph, path: &Path, count: usize) -> Result<LandmarkTable> {
    if path.exists() {
        match LandmarkTable::load(path) {
            Ok(table) if table.matches_graph(graph) => return Ok(table),
            Ok(_) => warn!(
                path = %path.display(),
                "landmark table was built for a different graph; rebuilding"
            ),
            Err(err) => warn!(error = %err, "failed to load landmark table; rebuilding"),
        }
    } else {
        info!(path = %path.display(), "no landmark table found; building one in memory");
    }
    build_from_all_nodes(graph, count)
}

fn load_threats(path: &Path) -> Result<Vec<ThreatPolygon>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read threats from {}", path.display()))?;
    let threats: Vec<ThreatPolygon> = serde_json::from_str(&contents)
        .with_context(|| format!("invalid threat file {}", path.display()))?;
    Ok(threats)
}
