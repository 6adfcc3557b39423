//! Output formatting for command results.
//!
//! Every command renders either a human-friendly text view or a JSON
//! document. Renderers write to any [`Write`] so they can be tested without a
//! terminal.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use graphmap_lib::{NodeId, RouteResponse};

use crate::terminal::{format_distance, format_with_separators, ColorPalette};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Result of the `build` command.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub artifact: PathBuf,
    pub nodes: usize,
    pub edges: usize,
    pub total_length_m: f64,
}

/// One selected landmark.
#[derive(Debug, Clone, Serialize)]
pub struct LandmarkEntry {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
}

/// Result of the `landmarks` command.
#[derive(Debug, Clone, Serialize)]
pub struct LandmarkSummary {
    pub table: PathBuf,
    pub landmarks: Vec<LandmarkEntry>,
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_build<W: Write>(
    out: &mut W,
    summary: &BuildSummary,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(out, summary),
        OutputFormat::Text => {
            let artifact = summary.artifact.display();
            let nodes = format_with_separators(summary.nodes as u64);
            let edges = format_with_separators(summary.edges as u64);
            let length = format_distance(summary.total_length_m);
            writeln!(out, "Graph artifact written to {artifact}")?;
            writeln!(out, "  Nodes: {nodes}")?;
            writeln!(out, "  Edges: {edges}")?;
            writeln!(out, "  Total road length: {length}")?;
            Ok(())
        }
    }
}

pub fn write_landmarks<W: Write>(
    out: &mut W,
    summary: &LandmarkSummary,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(out, summary),
        OutputFormat::Text => {
            writeln!(
                out,
                "Selected {} landmarks (table: {}):",
                summary.landmarks.len(),
                summary.table.display()
            )?;
            for landmark in &summary.landmarks {
                writeln!(
                    out,
                    "- {} ({:.5}, {:.5})",
                    landmark.id, landmark.lat, landmark.lon
                )?;
            }
            Ok(())
        }
    }
}

/// Render a computed route.
///
/// The text view lists the snapped waypoints with their settlement names when
/// available; the full polyline is only part of the JSON document.
pub fn write_route<W: Write>(
    out: &mut W,
    response: &RouteResponse,
    format: OutputFormat,
    palette: &ColorPalette,
) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, response);
    }

    let p = palette;
    writeln!(
        out,
        "Route with {} hops ({}{}{}; algorithm: {}):",
        response.hop_count(),
        p.green,
        format_distance(response.distance_meters),
        p.reset,
        response.algorithm
    )?;

    let last = response.waypoint_nodes.len().saturating_sub(1);
    for (index, node) in response.waypoint_nodes.iter().enumerate() {
        let (tag_color, tag) = match index {
            0 => (p.tag_start, "STRT"),
            i if i == last => (p.tag_goal, "GOAL"),
            _ => (p.tag_via, "VIA "),
        };
        let (lat, lon) = response.points[index];
        write!(
            out,
            "{tag_color}{tag}{reset} {bold}{node}{reset} {gray}({lat:.5}, {lon:.5}){reset}",
            reset = p.reset,
            bold = p.white_bold,
            gray = p.gray,
        )?;
        if let Some(name) = place_name(response, index) {
            write!(out, " {name}")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "\nNodes: {}", format_node_path(&response.node_path))?;
    Ok(())
}

fn place_name(response: &RouteResponse, index: usize) -> Option<&str> {
    let names = response.place_names.as_ref()?;
    let last = response.points.len().saturating_sub(1);
    match index {
        0 => names.start.as_deref(),
        i if i == last => names.end.as_deref(),
        i => names.intermediate.get(i - 1)?.as_deref(),
    }
}

fn format_node_path(path: &[NodeId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
