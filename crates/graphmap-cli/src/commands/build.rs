//! Graph artifact build command handler.

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};

use graphmap_lib::{load_raw_graph, save_graph, EngineConfig};

use graphmap_cli::output::{write_build, BuildSummary, OutputFormat};

/// Arguments for the build command.
#[derive(Debug, Clone)]
pub struct BuildArgs {
    /// Artifact path; the configured graph cache when `None`.
    pub out: Option<PathBuf>,
}

/// Parse the raw map and write the graph artifact.
pub fn handle_build(config: &EngineConfig, args: &BuildArgs, format: OutputFormat) -> Result<()> {
    let raw = config
        .raw_source
        .as_deref()
        .context("no raw map configured; pass --raw or set GRAPHMAP_RAW_SOURCE")?;
    let out = match &args.out {
        Some(path) => path.clone(),
        None => config.graph_cache_path()?,
    };

    let graph = load_raw_graph(raw)
        .with_context(|| format!("failed to build graph from {}", raw.display()))?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    save_graph(&graph, &out)
        .with_context(|| format!("failed to write graph artifact to {}", out.display()))?;

    let summary = BuildSummary {
        artifact: out,
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        total_length_m: graph.total_length(),
    };
    write_build(&mut io::stdout().lock(), &summary, format)
}
