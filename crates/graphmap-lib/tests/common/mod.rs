//! Common test utilities and fixture graphs.
//!
//! Integration tests build small synthetic road networks here instead of
//! shipping binary fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use graphmap_lib::{Graph, GraphBuilder, NodeId};
use serde_json::json;

/// Three nodes in a row: 1 -> 2 (100 m) -> 3 (150 m).
#[allow(dead_code)]
pub fn line_graph() -> Graph {
    let mut builder = GraphBuilder::new();
    builder.add_node(1, 50.0, 30.0).expect("node 1");
    builder.add_node(2, 50.01, 30.01).expect("node 2");
    builder.add_node(3, 50.02, 30.02).expect("node 3");
    builder.add_edge(1, 2, 100.0, None).expect("edge 1-2");
    builder.add_edge(2, 3, 150.0, None).expect("edge 2-3");
    builder.build()
}

/// Identifier of the grid node at `(row, col)`.
#[allow(dead_code)]
pub fn grid_id(cols: usize, row: usize, col: usize) -> NodeId {
    (row * cols + col + 1) as NodeId
}

/// Length of the link leaving `(row, col)` towards its right or lower
/// neighbour. Varies between 100 and 140 m so that shortest paths are not
/// trivially Manhattan.
fn link_length(row: usize, col: usize, vertical: bool) -> f64 {
    let salt = if vertical { 3 } else { 0 };
    100.0 + ((row * 7 + col * 13 + salt) % 5) as f64 * 10.0
}

/// `rows x cols` grid of two-way roads spaced roughly 100 m apart.
#[allow(dead_code)]
pub fn grid_graph(rows: usize, cols: usize) -> Graph {
    build_grid(rows, cols, false)
}

/// Grid where every horizontal road only runs eastwards.
#[allow(dead_code)]
pub fn one_way_grid_graph(rows: usize, cols: usize) -> Graph {
    build_grid(rows, cols, true)
}

fn build_grid(rows: usize, cols: usize, one_way_rows: bool) -> Graph {
    let mut builder = GraphBuilder::new();
    for row in 0..rows {
        for col in 0..cols {
            builder
                .add_node(
                    grid_id(cols, row, col),
                    50.0 + row as f64 * 0.0009,
                    30.0 + col as f64 * 0.0014,
                )
                .expect("grid node");
        }
    }

    for row in 0..rows {
        for col in 0..cols {
            let here = grid_id(cols, row, col);
            if col + 1 < cols {
                let east = grid_id(cols, row, col + 1);
                let length = link_length(row, col, false);
                if one_way_rows {
                    builder
                        .add_edge(here, east, length, None)
                        .expect("east edge");
                } else {
                    builder
                        .add_two_way(here, east, length, None)
                        .expect("east edge");
                }
            }
            if row + 1 < rows {
                let north = grid_id(cols, row + 1, col);
                builder
                    .add_two_way(here, north, link_length(row, col, true), None)
                    .expect("north edge");
            }
        }
    }

    builder.build()
}

/// Write `graph` as raw JSON map data into `dir` and return the file path.
#[allow(dead_code)]
pub fn write_raw_map(dir: &Path, graph: &Graph) -> PathBuf {
    let nodes: Vec<_> = graph
        .nodes()
        .iter()
        .map(|node| json!({ "id": node.id, "lat": node.lat, "lon": node.lon }))
        .collect();
    let edges: Vec<_> = graph
        .edges()
        .iter()
        .map(|edge| {
            json!({
                "from": graph.node(edge.source).id,
                "to": graph.node(edge.target).id,
                "length": edge.length,
                "geometry": edge.geometry,
            })
        })
        .collect();

    let path = dir.join("raw_map.json");
    fs::write(
        &path,
        serde_json::to_string_pretty(&json!({ "nodes": nodes, "edges": edges }))
            .expect("serialize raw map"),
    )
    .expect("write raw map");
    path
}
