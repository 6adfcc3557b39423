//! Landmark selection command handler.

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;

use graphmap_lib::{
    landmark_table_path, load_graph, refresh_landmarks, select_landmarks, EngineConfig, Graph,
    LandmarkTable, NodeId, PlaceTable,
};

use graphmap_cli::output::{write_landmarks, LandmarkEntry, LandmarkSummary, OutputFormat};

/// Arguments for the landmarks command.
#[derive(Debug, Clone)]
pub struct LandmarkArgs {
    pub count: Option<usize>,
    /// Regional center names; the configured list when empty.
    pub centers: Vec<String>,
    pub places: Option<PathBuf>,
}

/// Select landmarks, build their distance table and save it next to the
/// graph artifact.
///
/// With regional centers the candidates are their nearest nodes; otherwise
/// every node of the graph is a candidate.
pub fn handle_landmarks(
    config: &EngineConfig,
    args: &LandmarkArgs,
    format: OutputFormat,
) -> Result<()> {
    let source = config.graph_source()?;
    let graph = load_graph(&source)
        .with_context(|| format!("failed to load graph from {}", source.cache.display()))?;
    let count = args.count.unwrap_or(config.landmark_count);

    let centers = if args.centers.is_empty() {
        &config.regional_centers
    } else {
        &args.centers
    };

    let table = if centers.is_empty() {
        build_from_all_nodes(&graph, count)?
    } else {
        let places_file = args
            .places
            .as_deref()
            .or(config.places_file.as_deref())
            .context("regional centers need a places file; pass --places")?;
        let places = PlaceTable::from_path(places_file)
            .with_context(|| format!("failed to read places from {}", places_file.display()))?;
        refresh_landmarks(&graph, &places, centers, count)?
    };

    let table_path = landmark_table_path(&source.cache);
    table
        .save(&table_path)
        .with_context(|| format!("failed to write landmark table to {}", table_path.display()))?;

    let summary = LandmarkSummary {
        table: table_path,
        landmarks: table
            .landmarks()
            .iter()
            .filter_map(|&id| graph.node_by_id(id))
            .map(|node| LandmarkEntry {
                id: node.id,
                lat: node.lat,
                lon: node.lon,
            })
            .collect(),
    };
    write_landmarks(&mut io::stdout().lock(), &summary, format)
}

pub(crate) fn build_from_all_nodes(graph: &Graph, count: usize) -> Result<LandmarkTable> {
    if graph.is_empty() {
        bail!("graph has no nodes to select landmarks from");
    }

    let candidates: Vec<NodeId> = graph.nodes().iter().map(|node| node.id).collect();
    let count = count.min(candidates.len());
    info!(candidates = candidates.len(), count, "selecting landmarks");

    let landmarks = select_landmarks(graph, &candidates, count)?;
    Ok(LandmarkTable::build(graph, &landmarks)?)
}
