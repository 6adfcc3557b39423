//! Landmark selection and the ALT distance table.
//!
//! Landmarks are chosen with a farthest-point heuristic so that they are
//! spread across the network. For every landmark `L` the table stores the
//! shortest distance from `L` to each node and from each node to `L`. By the
//! triangle inequality these give a lower bound on the remaining distance to
//! any goal, which is what [`AltHeuristic`] evaluates during A*.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId};
use crate::path::{shortest_path_lengths, Direction};
use crate::places::Geocoder;
use crate::store::{graph_fingerprint, read_artifact, write_artifact, ArtifactHeader};

/// Magic bytes identifying a landmark table artifact.
const TABLE_MAGIC: &[u8; 4] = b"GMLT";

/// Number of landmarks chosen when the caller does not say otherwise.
pub const DEFAULT_LANDMARK_COUNT: usize = 5;

/// Choose up to `k` well separated landmarks among `candidates`.
///
/// The first candidate seeds the set. Each further landmark is the candidate
/// whose distance from its nearest already selected landmark is largest;
/// candidates unreachable from every selected landmark are skipped. When no
/// remaining candidate is reachable the selection stops early and returns
/// fewer than `k` landmarks.
pub fn select_landmarks(graph: &Graph, candidates: &[NodeId], k: usize) -> Result<Vec<NodeId>> {
    let mut seen = HashSet::new();
    let candidates: Vec<NodeId> = candidates
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    if k > candidates.len() {
        return Err(Error::invalid(format!(
            "cannot select {k} landmarks from {} candidates",
            candidates.len()
        )));
    }

    let indices = candidates
        .iter()
        .map(|&id| graph.require_index(id))
        .collect::<Result<Vec<_>>>()?;

    if k == 0 {
        return Ok(Vec::new());
    }

    let mut selected = vec![false; candidates.len()];
    let mut nearest_landmark = vec![f64::INFINITY; candidates.len()];
    let mut landmarks = Vec::with_capacity(k);

    let mut next = Some(0usize);
    while let Some(position) = next {
        selected[position] = true;
        landmarks.push(candidates[position]);
        if landmarks.len() == k {
            break;
        }

        let distances = shortest_path_lengths(graph, indices[position], Direction::Forward);
        for (slot, &index) in indices.iter().enumerate() {
            let distance = distances[index as usize];
            if distance < nearest_landmark[slot] {
                nearest_landmark[slot] = distance;
            }
        }

        next = None;
        let mut best = f64::NEG_INFINITY;
        for slot in 0..candidates.len() {
            let distance = nearest_landmark[slot];
            if selected[slot] || !distance.is_finite() {
                continue;
            }
            if distance > best {
                best = distance;
                next = Some(slot);
            }
        }

        if let Some(slot) = next {
            debug!(
                landmark = candidates[slot],
                separation_m = best,
                "selected landmark"
            );
        }
    }

    if landmarks.len() < k {
        warn!(
            requested = k,
            selected = landmarks.len(),
            "no reachable candidates left; continuing with fewer landmarks"
        );
    }

    Ok(landmarks)
}

/// Resolve regional-center names to their nearest graph nodes.
///
/// Names that fail to geocode, or resolve to a node already in the list, are
/// logged and skipped.
pub fn candidates_from_places(
    graph: &Graph,
    geocoder: &dyn Geocoder,
    names: &[String],
) -> Result<Vec<NodeId>> {
    let mut candidates = Vec::with_capacity(names.len());
    for name in names {
        let (lat, lon) = match geocoder.geocode(name) {
            Ok(point) => point,
            Err(err) => {
                warn!(name = %name, error = %err, "skipping regional center");
                continue;
            }
        };

        let node = graph.nearest_node(lat, lon)?;
        if candidates.contains(&node) {
            debug!(name = %name, node, "regional center shares a node with another center");
            continue;
        }
        candidates.push(node);
    }
    Ok(candidates)
}

/// Precomputed landmark distances backing the ALT heuristic.
///
/// Distances are stored densely per landmark and addressed by the node layout
/// of the graph the table was built on. Lookups go through [`NodeId`], so the
/// table remains valid for filtered copies of that graph: removing nodes never
/// shortens a path, so the bounds stay admissible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkTable {
    landmarks: Vec<NodeId>,
    node_ids: Vec<NodeId>,
    /// Fingerprint of the nodes and edges the distances were computed on.
    graph_fingerprint: [u8; 32],
    from_landmark: Vec<Vec<f64>>,
    to_landmark: Vec<Vec<f64>>,
    #[serde(skip)]
    slot_of: HashMap<NodeId, u32>,
}

impl LandmarkTable {
    /// Table without landmarks; its heuristic is always zero.
    pub fn empty() -> Self {
        Self {
            landmarks: Vec::new(),
            node_ids: Vec::new(),
            graph_fingerprint: [0; 32],
            from_landmark: Vec::new(),
            to_landmark: Vec::new(),
            slot_of: HashMap::new(),
        }
    }

    /// Run single-source shortest paths from and to every landmark.
    pub fn build(graph: &Graph, landmarks: &[NodeId]) -> Result<Self> {
        let mut from_landmark = Vec::with_capacity(landmarks.len());
        let mut to_landmark = Vec::with_capacity(landmarks.len());

        for &landmark in landmarks {
            let index = graph.require_index(landmark)?;
            let forward = shortest_path_lengths(graph, index, Direction::Forward);
            let backward = shortest_path_lengths(graph, index, Direction::Backward);
            debug!(
                landmark,
                reachable = forward.iter().filter(|d| d.is_finite()).count(),
                "computed landmark distances"
            );
            from_landmark.push(forward);
            to_landmark.push(backward);
        }

        let node_ids: Vec<NodeId> = graph.nodes().iter().map(|node| node.id).collect();

        info!(
            landmarks = landmarks.len(),
            nodes = node_ids.len(),
            "built landmark distance table"
        );

        Ok(Self::from_columns(
            landmarks.to_vec(),
            node_ids,
            graph_fingerprint(graph),
            from_landmark,
            to_landmark,
        ))
    }

    fn from_columns(
        landmarks: Vec<NodeId>,
        node_ids: Vec<NodeId>,
        graph_fingerprint: [u8; 32],
        from_landmark: Vec<Vec<f64>>,
        to_landmark: Vec<Vec<f64>>,
    ) -> Self {
        let slot_of = node_ids
            .iter()
            .enumerate()
            .map(|(slot, &id)| (id, slot as u32))
            .collect();
        Self {
            landmarks,
            node_ids,
            graph_fingerprint,
            from_landmark,
            to_landmark,
            slot_of,
        }
    }

    /// Landmarks in selection order.
    pub fn landmarks(&self) -> &[NodeId] {
        &self.landmarks
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Shortest distance from `landmark` to `node`, if both are known and the
    /// node is reachable.
    pub fn distance_from(&self, landmark: NodeId, node: NodeId) -> Option<f64> {
        let row = self.landmarks.iter().position(|&l| l == landmark)?;
        let slot = *self.slot_of.get(&node)?;
        let distance = self.from_landmark[row][slot as usize];
        distance.is_finite().then_some(distance)
    }

    /// Shortest distance from `node` to `landmark`.
    pub fn distance_to(&self, landmark: NodeId, node: NodeId) -> Option<f64> {
        let row = self.landmarks.iter().position(|&l| l == landmark)?;
        let slot = *self.slot_of.get(&node)?;
        let distance = self.to_landmark[row][slot as usize];
        distance.is_finite().then_some(distance)
    }

    /// Prepare the heuristic for searches ending at `goal`.
    pub fn heuristic_to(&self, goal: NodeId) -> AltHeuristic<'_> {
        let (goal_from, goal_to) = match self.slot_of.get(&goal) {
            Some(&slot) => (
                self.from_landmark
                    .iter()
                    .map(|row| row[slot as usize])
                    .collect(),
                self.to_landmark
                    .iter()
                    .map(|row| row[slot as usize])
                    .collect(),
            ),
            None => (
                vec![f64::INFINITY; self.landmarks.len()],
                vec![f64::INFINITY; self.landmarks.len()],
            ),
        };

        AltHeuristic {
            table: self,
            goal_from,
            goal_to,
        }
    }

    /// Serialize the table to an artifact file.
    pub fn save(&self, path: &Path) -> Result<()> {
        info!(
            path = %path.display(),
            landmarks = self.landmarks.len(),
            "saving landmark table"
        );

        let header = ArtifactHeader {
            magic: *TABLE_MAGIC,
            flags: 0,
            primary_count: self.landmarks.len() as u32,
            secondary_count: self.node_ids.len() as u32,
        };
        write_artifact(path, &header, self)
    }

    /// Load a table written by [`LandmarkTable::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let (_header, table): (ArtifactHeader, LandmarkTable) = read_artifact(path, TABLE_MAGIC)?;

        let rows_match = |rows: &[Vec<f64>]| {
            rows.len() == table.landmarks.len()
                && rows.iter().all(|row| row.len() == table.node_ids.len())
        };
        if !rows_match(&table.from_landmark) || !rows_match(&table.to_landmark) {
            return Err(Error::ArtifactLoad {
                path: path.to_path_buf(),
                message: "landmark table rows do not match node count".to_string(),
            });
        }

        let table = Self::from_columns(
            table.landmarks,
            table.node_ids,
            table.graph_fingerprint,
            table.from_landmark,
            table.to_landmark,
        );

        info!(
            path = %path.display(),
            landmarks = table.landmarks.len(),
            "loaded landmark table"
        );

        Ok(table)
    }

    /// Whether the table was built on a graph with exactly these nodes and
    /// edges. Any change to a road or its length makes the table stale.
    pub fn matches_graph(&self, graph: &Graph) -> bool {
        self.node_ids.len() == graph.node_count()
            && self
                .node_ids
                .iter()
                .zip(graph.nodes())
                .all(|(&id, node)| id == node.id)
            && self.graph_fingerprint == graph_fingerprint(graph)
    }
}

/// Derive the landmark table path from a graph artifact path.
///
/// For example, `graph.bin` -> `graph.bin.landmarks.bin`.
pub fn landmark_table_path(graph_path: &Path) -> PathBuf {
    let mut path = graph_path.as_os_str().to_owned();
    path.push(".landmarks.bin");
    PathBuf::from(path)
}

/// ALT lower bound on the distance from a node to a fixed goal.
///
/// For each landmark `L` two bounds apply: `d(L, goal) - d(L, u)` and
/// `d(u, L) - d(goal, L)`. On networks where every road is two-way both
/// collapse to `|d(L, u) - d(L, goal)|`. Bounds involving an unreachable
/// distance are ignored.
#[derive(Debug)]
pub struct AltHeuristic<'a> {
    table: &'a LandmarkTable,
    goal_from: Vec<f64>,
    goal_to: Vec<f64>,
}

impl AltHeuristic<'_> {
    pub fn estimate(&self, node: NodeId) -> f64 {
        let Some(&slot) = self.table.slot_of.get(&node) else {
            return 0.0;
        };
        let slot = slot as usize;

        let mut bound = 0.0f64;
        for row in 0..self.goal_from.len() {
            let from_node = self.table.from_landmark[row][slot];
            let from_goal = self.goal_from[row];
            if from_node.is_finite() && from_goal.is_finite() {
                bound = bound.max(from_goal - from_node);
            }

            let node_to = self.table.to_landmark[row][slot];
            let goal_to = self.goal_to[row];
            if node_to.is_finite() && goal_to.is_finite() {
                bound = bound.max(node_to - goal_to);
            }
        }
        bound
    }
}
