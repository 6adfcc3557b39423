//! Graphmap library entry points.
//!
//! This crate loads a road network into memory, removes threat zones from it,
//! precomputes landmark distances and answers multi-waypoint route queries
//! with Dijkstra or ALT (A* with landmarks). Higher-level consumers (the CLI)
//! should only depend on the functions exported here instead of
//! reimplementing behavior.
//!

#![deny(warnings)]

pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod landmarks;
pub mod path;
pub mod places;
pub mod route;
pub mod routing;
pub mod spatial;
pub mod store;
pub mod threat;

pub use cache::RouteCache;
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use graph::{Edge, Graph, GraphBuilder, Node, NodeId};
pub use landmarks::{
    candidates_from_places, landmark_table_path, select_landmarks, AltHeuristic, LandmarkTable,
};
pub use path::{find_route_alt, find_route_dijkstra, shortest_path_lengths, Direction};
pub use places::{Geocoder, PlaceTable, Settlement, SettlementLookup, SettlementTable};
pub use route::{assemble_route, route_coordinates, route_distance, RoutePath};
pub use routing::{
    annotate_route, refresh_landmarks, shortest_path, stitch_route, PlaceNames, RouteAlgorithm,
    RouteRequest, RouteResponse, RoutingEngine,
};
pub use store::{
    default_graph_cache_path, load_graph, load_graph_artifact, load_raw_graph, save_graph,
    GraphSource,
};
pub use threat::{filter_threats, ThreatPolygon};
