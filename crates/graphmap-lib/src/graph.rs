//! Arena representation of the road network.
//!
//! Nodes and edges live in flat vectors addressed by dense [`NodeIndex`] and
//! [`EdgeIndex`] values. External callers speak in [`NodeId`] (the identifier
//! carried by the raw map data); the graph translates between the two.

use std::collections::{HashMap, HashSet};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::spatial::NodeLocator;

/// Identifier of a road-network node as it appears in the source data.
pub type NodeId = i64;

/// Dense position of a node inside a [`Graph`].
pub type NodeIndex = u32;

/// Dense position of an edge inside a [`Graph`].
pub type EdgeIndex = u32;

/// Road-network node with WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
}

/// Directed road segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeIndex,
    pub target: NodeIndex,
    /// Length in metres.
    pub length: f64,
    /// Road curve as `[lon, lat]` pairs, endpoints included.
    pub geometry: Option<Vec<[f64; 2]>>,
}

/// Immutable road-network graph.
///
/// Parallel edges are allowed. Edge lists preserve insertion order, so the
/// first edge added between two nodes is the one [`Graph::edge_between`]
/// returns, and the only one searches travel along.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<EdgeIndex>>,
    incoming: Vec<Vec<EdgeIndex>>,
    /// Whether an edge is the first one recorded for its `(source, target)`.
    first_of_pair: Vec<bool>,
    index_of: HashMap<NodeId, NodeIndex>,
    locator: OnceCell<NodeLocator>,
}

impl Graph {
    /// Assemble a graph from already validated nodes and edges.
    pub(crate) fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        for (index, edge) in edges.iter().enumerate() {
            outgoing[edge.source as usize].push(index as EdgeIndex);
            incoming[edge.target as usize].push(index as EdgeIndex);
        }

        let mut pairs = HashSet::with_capacity(edges.len());
        let first_of_pair = edges
            .iter()
            .map(|edge| pairs.insert((edge.source, edge.target)))
            .collect();

        let index_of = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id, index as NodeIndex))
            .collect();

        Self {
            nodes,
            edges,
            outgoing,
            incoming,
            first_of_pair,
            index_of,
            locator: OnceCell::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Node stored at `index`.
    ///
    /// Panics when `index` is out of bounds; indices only come from this graph.
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index as usize]
    }

    /// Translate a node identifier into its dense index.
    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.index_of.get(&id).copied()
    }

    /// Translate a node identifier, failing with [`Error::UnknownNode`].
    pub fn require_index(&self, id: NodeId) -> Result<NodeIndex> {
        self.index_of(id).ok_or(Error::UnknownNode { id })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index_of.contains_key(&id)
    }

    /// Lookup a node by identifier.
    pub fn node_by_id(&self, id: NodeId) -> Option<&Node> {
        self.index_of(id).map(|index| self.node(index))
    }

    /// Edges leaving `index`, in insertion order.
    pub fn outgoing(&self, index: NodeIndex) -> impl Iterator<Item = &Edge> + '_ {
        self.outgoing[index as usize]
            .iter()
            .map(move |&edge| &self.edges[edge as usize])
    }

    /// Edges arriving at `index`, in insertion order.
    pub fn incoming(&self, index: NodeIndex) -> impl Iterator<Item = &Edge> + '_ {
        self.incoming[index as usize]
            .iter()
            .map(move |&edge| &self.edges[edge as usize])
    }

    /// Outgoing edges with parallel duplicates skipped.
    ///
    /// Only the first edge towards each neighbour is yielded, matching
    /// [`Graph::edge_between`].
    pub fn links_from(&self, index: NodeIndex) -> impl Iterator<Item = &Edge> + '_ {
        self.outgoing[index as usize]
            .iter()
            .filter(move |&&edge| self.first_of_pair[edge as usize])
            .map(move |&edge| &self.edges[edge as usize])
    }

    /// Incoming edges with parallel duplicates skipped.
    pub fn links_to(&self, index: NodeIndex) -> impl Iterator<Item = &Edge> + '_ {
        self.incoming[index as usize]
            .iter()
            .filter(move |&&edge| self.first_of_pair[edge as usize])
            .map(move |&edge| &self.edges[edge as usize])
    }

    /// First edge recorded from `source` to `target`.
    pub fn edge_between(&self, source: NodeIndex, target: NodeIndex) -> Option<&Edge> {
        self.outgoing(source).find(|edge| edge.target == target)
    }

    /// Same as [`Graph::edge_between`] but addressed by node identifiers.
    pub fn edge_between_ids(&self, source: NodeId, target: NodeId) -> Option<&Edge> {
        let source = self.index_of(source)?;
        let target = self.index_of(target)?;
        self.edge_between(source, target)
    }

    /// Sum of all edge lengths in metres.
    pub fn total_length(&self) -> f64 {
        self.edges.iter().map(|edge| edge.length).sum()
    }

    /// Return the node closest to `(lat, lon)` by great-circle distance.
    pub fn nearest_node(&self, lat: f64, lon: f64) -> Result<NodeId> {
        self.locator()
            .nearest(lat, lon)
            .map(|index| self.node(index).id)
            .ok_or(Error::NodeNotFound { lat, lon })
    }

    fn locator(&self) -> &NodeLocator {
        self.locator.get_or_init(|| NodeLocator::build(&self.nodes))
    }

    /// Build an independent copy that keeps only the nodes accepted by `keep`.
    ///
    /// Edges touching a dropped node are dropped as well. Relative order of the
    /// surviving nodes and edges is preserved, so parallel-edge selection stays
    /// the same on the copy.
    pub fn retain_nodes<F>(&self, mut keep: F) -> Graph
    where
        F: FnMut(&Node) -> bool,
    {
        let mut remap: Vec<Option<NodeIndex>> = Vec::with_capacity(self.nodes.len());
        let mut nodes = Vec::new();
        for node in &self.nodes {
            if keep(node) {
                remap.push(Some(nodes.len() as NodeIndex));
                nodes.push(*node);
            } else {
                remap.push(None);
            }
        }

        let edges = self
            .edges
            .iter()
            .filter_map(|edge| {
                let source = remap[edge.source as usize]?;
                let target = remap[edge.target as usize]?;
                Some(Edge {
                    source,
                    target,
                    length: edge.length,
                    geometry: edge.geometry.clone(),
                })
            })
            .collect();

        Graph::from_parts(nodes, edges)
    }
}

impl Clone for Graph {
    // The nearest-node index is rebuilt lazily on the copy.
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            outgoing: self.outgoing.clone(),
            incoming: self.incoming.clone(),
            first_of_pair: self.first_of_pair.clone(),
            index_of: self.index_of.clone(),
            locator: OnceCell::new(),
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Graph::from_parts(Vec::new(), Vec::new())
    }
}

/// Incremental, validating constructor for [`Graph`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index_of: HashMap<NodeId, NodeIndex>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Identifiers must be unique and coordinates finite.
    pub fn add_node(&mut self, id: NodeId, lat: f64, lon: f64) -> Result<&mut Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(Error::invalid(format!("node {id} has non-finite coordinates")));
        }
        if self.index_of.contains_key(&id) {
            return Err(Error::invalid(format!("duplicate node id {id}")));
        }

        self.index_of.insert(id, self.nodes.len() as NodeIndex);
        self.nodes.push(Node { id, lat, lon });
        Ok(self)
    }

    /// Add a directed edge between two previously added nodes.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        length: f64,
        geometry: Option<Vec<[f64; 2]>>,
    ) -> Result<&mut Self> {
        if !length.is_finite() || length < 0.0 {
            return Err(Error::invalid(format!(
                "edge {source} -> {target} has invalid length {length}"
            )));
        }
        let source_index = *self
            .index_of
            .get(&source)
            .ok_or(Error::UnknownNode { id: source })?;
        let target_index = *self
            .index_of
            .get(&target)
            .ok_or(Error::UnknownNode { id: target })?;

        self.edges.push(Edge {
            source: source_index,
            target: target_index,
            length,
            geometry: geometry.filter(|points| !points.is_empty()),
        });
        Ok(self)
    }

    /// Add a pair of opposite edges sharing the same length.
    ///
    /// The reverse edge receives the reversed geometry.
    pub fn add_two_way(
        &mut self,
        a: NodeId,
        b: NodeId,
        length: f64,
        geometry: Option<Vec<[f64; 2]>>,
    ) -> Result<&mut Self> {
        let reversed = geometry.as_ref().map(|points| {
            let mut points = points.clone();
            points.reverse();
            points
        });
        self.add_edge(a, b, length, geometry)?;
        self.add_edge(b, a, length, reversed)
    }

    pub fn build(self) -> Graph {
        Graph::from_parts(self.nodes, self.edges)
    }
}
