//! Turn a node path into drawable coordinates and a total length.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::graph::{Edge, Graph, NodeId};

/// Geometry and length of a node path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePath {
    pub nodes: Vec<NodeId>,
    /// `(lat, lon)` points in travel order.
    pub coordinates: Vec<(f64, f64)>,
    pub distance_m: f64,
}

/// Polyline for `path`.
///
/// Each hop contributes the geometry of the edge joining the pair, or the two
/// node coordinates when the edge has none. Junction points shared by
/// neighbouring hops are kept twice. A single-node path yields that node's
/// coordinate.
pub fn route_coordinates(graph: &Graph, path: &[NodeId]) -> Result<Vec<(f64, f64)>> {
    if let [only] = path {
        let node = graph
            .node_by_id(*only)
            .ok_or(Error::UnknownNode { id: *only })?;
        return Ok(vec![(node.lat, node.lon)]);
    }

    let mut coordinates = Vec::new();
    for pair in path.windows(2) {
        let edge = hop(graph, pair[0], pair[1])?;
        match &edge.geometry {
            Some(points) => coordinates.extend(points.iter().map(|&[lon, lat]| (lat, lon))),
            None => {
                let from = graph.node(edge.source);
                let to = graph.node(edge.target);
                coordinates.push((from.lat, from.lon));
                coordinates.push((to.lat, to.lon));
            }
        }
    }
    Ok(coordinates)
}

/// Sum of edge lengths along `path` in metres.
pub fn route_distance(graph: &Graph, path: &[NodeId]) -> Result<f64> {
    path.windows(2)
        .map(|pair| hop(graph, pair[0], pair[1]).map(|edge| edge.length))
        .sum()
}

pub fn assemble_route(graph: &Graph, path: &[NodeId]) -> Result<RoutePath> {
    Ok(RoutePath {
        nodes: path.to_vec(),
        coordinates: route_coordinates(graph, path)?,
        distance_m: route_distance(graph, path)?,
    })
}

/// First edge in insertion order joining `from` to `to`.
fn hop(graph: &Graph, from: NodeId, to: NodeId) -> Result<&Edge> {
    graph.require_index(from)?;
    graph.require_index(to)?;
    graph
        .edge_between_ids(from, to)
        .ok_or_else(|| Error::invalid(format!("no edge joins node {from} to node {to}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn line_graph() -> Graph {
        let mut builder = GraphBuilder::new();
        builder.add_node(1, 50.0, 30.0).unwrap();
        builder.add_node(2, 50.01, 30.01).unwrap();
        builder.add_node(3, 50.02, 30.02).unwrap();
        builder
            .add_edge(
                1,
                2,
                100.0,
                Some(vec![[30.0, 50.0], [30.005, 50.004], [30.01, 50.01]]),
            )
            .unwrap();
        builder.add_edge(2, 3, 150.0, None).unwrap();
        builder.build()
    }

    #[test]
    fn coordinates_use_geometry_then_node_points() {
        let graph = line_graph();
        let coordinates = route_coordinates(&graph, &[1, 2, 3]).unwrap();
        assert_eq!(
            coordinates,
            vec![
                (50.0, 30.0),
                (50.004, 30.005),
                (50.01, 30.01),
                (50.01, 30.01),
                (50.02, 30.02),
            ]
        );
    }

    #[test]
    fn single_node_path_is_a_point() {
        let graph = line_graph();
        let route = assemble_route(&graph, &[2]).unwrap();
        assert_eq!(route.coordinates, vec![(50.01, 30.01)]);
        assert_eq!(route.distance_m, 0.0);
    }

    #[test]
    fn distance_sums_edge_lengths() {
        let graph = line_graph();
        assert_eq!(route_distance(&graph, &[1, 2, 3]).unwrap(), 250.0);
        assert_eq!(route_distance(&graph, &[]).unwrap(), 0.0);
    }

    #[test]
    fn parallel_edges_use_the_first_inserted() {
        let mut builder = GraphBuilder::new();
        builder.add_node(1, 0.0, 0.0).unwrap();
        builder.add_node(2, 0.0, 0.001).unwrap();
        builder.add_edge(1, 2, 80.0, None).unwrap();
        builder.add_edge(1, 2, 40.0, None).unwrap();
        let graph = builder.build();

        assert_eq!(route_distance(&graph, &[1, 2]).unwrap(), 80.0);
    }

    #[test]
    fn missing_hop_is_rejected() {
        let graph = line_graph();
        let error = route_distance(&graph, &[1, 3]).unwrap_err();
        assert!(matches!(error, Error::InvalidArgument { .. }));

        let error = route_coordinates(&graph, &[9]).unwrap_err();
        assert!(matches!(error, Error::UnknownNode { id: 9 }));
    }
}
