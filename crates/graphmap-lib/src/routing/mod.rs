//! Route planning over the road graph.
//!
//! This module provides:
//! - [`RouteAlgorithm`] - Supported search algorithms (Dijkstra, ALT)
//! - [`shortest_path`] / [`stitch_route`] - Node-level path queries
//! - [`RouteRequest`] / [`RouteResponse`] - Coordinate-level route queries
//! - [`RoutingEngine`] - Shared graph and landmark table answering requests
//!
//! # Strategy Pattern
//!
//! Each algorithm is encapsulated in its own planner struct behind the
//! [`RoutePlanner`] trait; [`select_planner`] maps a [`RouteAlgorithm`] to it.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use graphmap_lib::{load_graph, GraphSource, LandmarkTable, RouteRequest, RoutingEngine};
//!
//! let graph = load_graph(&GraphSource::cache_only("graph.bin"))?;
//! let engine = RoutingEngine::new(Arc::new(graph), Arc::new(LandmarkTable::empty()));
//! let response = engine.compute_route(&RouteRequest::new(vec![(50.0, 30.0), (50.02, 30.02)]))?;
//! println!("{:.0} m", response.distance_meters);
//! ```

mod planner;

pub use planner::{select_planner, AltPlanner, DijkstraPlanner, RoutePlanner};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId};
use crate::landmarks::{candidates_from_places, select_landmarks, LandmarkTable};
use crate::places::{Geocoder, SettlementLookup};
use crate::route::assemble_route;
use crate::threat::{filter_threats, ThreatPolygon};

/// Supported routing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RouteAlgorithm {
    /// Dijkstra's algorithm over edge lengths.
    Dijkstra,
    /// A* with the landmark lower bound.
    #[default]
    Alt,
}

impl fmt::Display for RouteAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RouteAlgorithm::Dijkstra => "dijkstra",
            RouteAlgorithm::Alt => "alt",
        };
        f.write_str(value)
    }
}

impl FromStr for RouteAlgorithm {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(RouteAlgorithm::Dijkstra),
            "alt" => Ok(RouteAlgorithm::Alt),
            other => Err(Error::invalid(format!(
                "unknown algorithm '{other}' (expected 'dijkstra' or 'alt')"
            ))),
        }
    }
}

/// Shortest path between two nodes.
///
/// Returns `[start]` when both ends are the same node, and
/// [`Error::NoPathFound`] when `goal` cannot be reached.
pub fn shortest_path(
    graph: &Graph,
    start: NodeId,
    goal: NodeId,
    algorithm: RouteAlgorithm,
    table: &LandmarkTable,
) -> Result<Vec<NodeId>> {
    let planner = select_planner(algorithm, table);
    find_with(planner.as_ref(), graph, start, goal)
}

fn find_with(
    planner: &dyn RoutePlanner,
    graph: &Graph,
    start: NodeId,
    goal: NodeId,
) -> Result<Vec<NodeId>> {
    let start_index = graph.require_index(start)?;
    let goal_index = graph.require_index(goal)?;

    let path = planner
        .find_path(graph, start_index, goal_index)
        .ok_or(Error::NoPathFound { start, goal })?;

    Ok(path.into_iter().map(|index| graph.node(index).id).collect())
}

/// Route through `waypoints` in order.
///
/// One search runs per consecutive pair. Segments are joined without repeating
/// the shared waypoint, so `[A, A]` yields `[A]`. A pair with no path fails
/// with [`Error::SegmentUnreachable`] naming its position.
pub fn stitch_route(
    graph: &Graph,
    waypoints: &[NodeId],
    algorithm: RouteAlgorithm,
    table: &LandmarkTable,
) -> Result<Vec<NodeId>> {
    if waypoints.len() < 2 {
        return Err(Error::invalid(format!(
            "a route needs at least 2 waypoints, got {}",
            waypoints.len()
        )));
    }

    let planner = select_planner(algorithm, table);
    let mut route = Vec::new();

    for (index, pair) in waypoints.windows(2).enumerate() {
        let (start, goal) = (pair[0], pair[1]);
        let segment = match find_with(planner.as_ref(), graph, start, goal) {
            Ok(segment) => segment,
            Err(Error::NoPathFound { .. }) => {
                return Err(Error::SegmentUnreachable { index, start, goal });
            }
            Err(err) => return Err(err),
        };

        debug!(
            segment = index,
            start,
            goal,
            hops = segment.len().saturating_sub(1),
            "routed segment"
        );

        route.extend_from_slice(&segment[..segment.len() - 1]);
    }

    if let Some(&last) = waypoints.last() {
        route.push(last);
    }
    Ok(route)
}

/// Coordinate-level route query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    /// `(lat, lon)` points to visit in order; start and end included.
    pub points: Vec<(f64, f64)>,
    #[serde(default)]
    pub algorithm: RouteAlgorithm,
    /// Zones the route must avoid.
    #[serde(default)]
    pub threats: Vec<ThreatPolygon>,
}

impl RouteRequest {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self {
            points,
            algorithm: RouteAlgorithm::default(),
            threats: Vec::new(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: RouteAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_threats(mut self, threats: Vec<ThreatPolygon>) -> Self {
        self.threats = threats;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.points.len() < 2 {
            return Err(Error::invalid(format!(
                "a route needs at least 2 points, got {}",
                self.points.len()
            )));
        }
        if let Some((lat, lon)) = self
            .points
            .iter()
            .find(|(lat, lon)| !lat.is_finite() || !lon.is_finite())
        {
            return Err(Error::invalid(format!("invalid point ({lat}, {lon})")));
        }
        Ok(())
    }
}

/// Settlement names near the requested points.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaceNames {
    pub start: Option<String>,
    pub end: Option<String>,
    /// One entry per intermediate point.
    pub intermediate: Vec<Option<String>>,
}

/// Computed route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResponse {
    pub algorithm: RouteAlgorithm,
    /// Requested points, echoed back.
    pub points: Vec<(f64, f64)>,
    /// Graph nodes the points were snapped to.
    pub waypoint_nodes: Vec<NodeId>,
    pub node_path: Vec<NodeId>,
    /// `(lat, lon)` polyline of the route.
    pub coordinates: Vec<(f64, f64)>,
    pub distance_meters: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_names: Option<PlaceNames>,
}

impl RouteResponse {
    /// Number of edges travelled.
    pub fn hop_count(&self) -> usize {
        self.node_path.len().saturating_sub(1)
    }
}

/// Attach the nearest settlement name to every requested point.
///
/// Points with no settlement within `radius_m` metres get `None`.
pub fn annotate_route(
    response: &mut RouteResponse,
    settlements: &dyn SettlementLookup,
    radius_m: f64,
) {
    let mut names: Vec<Option<String>> = response
        .points
        .iter()
        .map(|&(lat, lon)| settlements.nearest_settlement(lat, lon, radius_m))
        .collect();

    let end = names.pop().flatten();
    let start = if names.is_empty() {
        None
    } else {
        names.remove(0)
    };

    response.place_names = Some(PlaceNames {
        start,
        end,
        intermediate: names,
    });
}

/// Select landmarks among named regional centers and build their table.
pub fn refresh_landmarks(
    graph: &Graph,
    geocoder: &dyn Geocoder,
    names: &[String],
    k: usize,
) -> Result<LandmarkTable> {
    let candidates = candidates_from_places(graph, geocoder, names)?;
    let k = k.min(candidates.len());
    let landmarks = select_landmarks(graph, &candidates, k)?;
    LandmarkTable::build(graph, &landmarks)
}

/// Shared road graph plus landmark table answering route requests.
///
/// Both are immutable and reference counted, so an engine can be cloned
/// cheaply into worker threads.
#[derive(Debug, Clone)]
pub struct RoutingEngine {
    graph: Arc<Graph>,
    landmarks: Arc<LandmarkTable>,
}

impl RoutingEngine {
    pub fn new(graph: Arc<Graph>, landmarks: Arc<LandmarkTable>) -> Self {
        Self { graph, landmarks }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn landmarks(&self) -> &LandmarkTable {
        &self.landmarks
    }

    /// Rebuild the landmark table from regional-center names.
    pub fn refresh_landmarks(
        &mut self,
        geocoder: &dyn Geocoder,
        names: &[String],
        k: usize,
    ) -> Result<&LandmarkTable> {
        let table = refresh_landmarks(&self.graph, geocoder, names, k)?;
        self.landmarks = Arc::new(table);
        Ok(self.landmarks.as_ref())
    }

    /// Compute a route through the requested points.
    ///
    /// Threat zones are removed from a private copy of the graph before the
    /// points are snapped to their nearest nodes, so no waypoint lands inside
    /// a zone.
    pub fn compute_route(&self, request: &RouteRequest) -> Result<RouteResponse> {
        request.validate()?;

        let filtered;
        let graph: &Graph = if request.threats.is_empty() {
            &self.graph
        } else {
            filtered = filter_threats(&self.graph, &request.threats)?;
            &filtered
        };

        let waypoint_nodes = request
            .points
            .iter()
            .map(|&(lat, lon)| graph.nearest_node(lat, lon))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            algorithm = %request.algorithm,
            points = request.points.len(),
            threats = request.threats.len(),
            waypoints = ?waypoint_nodes,
            "computing route"
        );

        let node_path = stitch_route(graph, &waypoint_nodes, request.algorithm, &self.landmarks)?;
        let route = assemble_route(graph, &node_path)?;

        info!(
            algorithm = %request.algorithm,
            hops = node_path.len().saturating_sub(1),
            distance_m = route.distance_m,
            "route computed"
        );

        Ok(RouteResponse {
            algorithm: request.algorithm,
            points: request.points.clone(),
            waypoint_nodes,
            node_path: route.nodes,
            coordinates: route.coordinates,
            distance_meters: route.distance_m,
            place_names: None,
        })
    }
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
        builder.add_edge(1, 2, 100.0, None).unwrap();
        builder.add_edge(2, 3, 150.0, None).unwrap();
        builder.build()
    }

    #[test]
    fn algorithm_parses_and_displays() {
        assert_eq!(
            "ALT".parse::<RouteAlgorithm>().unwrap(),
            RouteAlgorithm::Alt
        );
        assert_eq!(
            "dijkstra".parse::<RouteAlgorithm>().unwrap(),
            RouteAlgorithm::Dijkstra
        );
        assert!("bfs".parse::<RouteAlgorithm>().is_err());
        assert_eq!(RouteAlgorithm::Dijkstra.to_string(), "dijkstra");
        assert_eq!(RouteAlgorithm::default(), RouteAlgorithm::Alt);
    }

    #[test]
    fn stitch_reports_failing_segment() {
        let graph = line_graph();
        let table = LandmarkTable::empty();
        let error = stitch_route(&graph, &[1, 3, 1], RouteAlgorithm::Dijkstra, &table).unwrap_err();
        assert!(matches!(
            error,
            Error::SegmentUnreachable {
                index: 1,
                start: 3,
                goal: 1
            }
        ));
    }

    #[test]
    fn stitch_drops_shared_waypoints() {
        let graph = line_graph();
        let table = LandmarkTable::empty();
        let route = stitch_route(&graph, &[1, 2, 3], RouteAlgorithm::Alt, &table).unwrap();
        assert_eq!(route, vec![1, 2, 3]);
    }

    #[test]
    fn request_needs_two_points() {
        let engine = RoutingEngine::new(Arc::new(line_graph()), Arc::new(LandmarkTable::empty()));
        let error = engine
            .compute_route(&RouteRequest::new(vec![(50.0, 30.0)]))
            .unwrap_err();
        assert!(matches!(error, Error::InvalidArgument { .. }));
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: RouteRequest =
            serde_json::from_str(r#"{"points": [[50.0, 30.0], [50.02, 30.02]]}"#).unwrap();
        assert_eq!(request.algorithm, RouteAlgorithm::Alt);
        assert!(request.threats.is_empty());
    }

    struct Fixed;

    impl SettlementLookup for Fixed {
        fn nearest_settlement(&self, lat: f64, _lon: f64, _radius_m: f64) -> Option<String> {
            (lat < 50.015).then(|| format!("town-{lat}"))
        }
    }

    #[test]
    fn annotation_covers_every_point() {
        let engine = RoutingEngine::new(Arc::new(line_graph()), Arc::new(LandmarkTable::empty()));
        let mut response = engine
            .compute_route(&RouteRequest::new(vec![
                (50.0, 30.0),
                (50.01, 30.01),
                (50.02, 30.02),
            ]))
            .unwrap();

        annotate_route(&mut response, &Fixed, 1_000.0);
        let names = response.place_names.unwrap();
        assert_eq!(names.start.as_deref(), Some("town-50"));
        assert_eq!(names.intermediate, vec![Some("town-50.01".to_string())]);
        assert_eq!(names.end, None);
    }
}
