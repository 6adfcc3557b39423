//! Route planning strategies implementing the Strategy pattern.
//!
//! This module provides the `RoutePlanner` trait and one implementation per
//! search algorithm. [`select_planner`] picks the strategy for a request so
//! the orchestration code in [`super`] never matches on the algorithm itself.

use crate::graph::{Graph, NodeIndex};
use crate::landmarks::LandmarkTable;
use crate::path::{find_route_alt, find_route_dijkstra};

use super::RouteAlgorithm;

/// Trait for route planning strategies.
pub trait RoutePlanner: Send + Sync {
    /// The algorithm identifier for this planner.
    fn algorithm(&self) -> RouteAlgorithm;

    /// Execute the search on the given graph.
    ///
    /// Returns `Some(path)` if a route is found, `None` otherwise.
    fn find_path(&self, graph: &Graph, start: NodeIndex, goal: NodeIndex)
        -> Option<Vec<NodeIndex>>;
}

/// Plain Dijkstra over edge lengths.
#[derive(Debug, Clone, Default)]
pub struct DijkstraPlanner;

impl RoutePlanner for DijkstraPlanner {
    fn algorithm(&self) -> RouteAlgorithm {
        RouteAlgorithm::Dijkstra
    }

    fn find_path(
        &self,
        graph: &Graph,
        start: NodeIndex,
        goal: NodeIndex,
    ) -> Option<Vec<NodeIndex>> {
        find_route_dijkstra(graph, start, goal)
    }
}

/// A* guided by precomputed landmark distances.
#[derive(Debug, Clone)]
pub struct AltPlanner<'a> {
    table: &'a LandmarkTable,
}

impl<'a> AltPlanner<'a> {
    pub fn new(table: &'a LandmarkTable) -> Self {
        Self { table }
    }
}

impl RoutePlanner for AltPlanner<'_> {
    fn algorithm(&self) -> RouteAlgorithm {
        RouteAlgorithm::Alt
    }

    fn find_path(
        &self,
        graph: &Graph,
        start: NodeIndex,
        goal: NodeIndex,
    ) -> Option<Vec<NodeIndex>> {
        find_route_alt(graph, start, goal, self.table)
    }
}

/// Select the planner for `algorithm`.
pub fn select_planner<'a>(
    algorithm: RouteAlgorithm,
    table: &'a LandmarkTable,
) -> Box<dyn RoutePlanner + 'a> {
    match algorithm {
        RouteAlgorithm::Dijkstra => Box::new(DijkstraPlanner),
        RouteAlgorithm::Alt => Box::new(AltPlanner::new(table)),
    }
}
