//! KD-tree backed nearest-node lookup.
//!
//! Coordinates are projected onto the unit sphere before indexing. The
//! Euclidean chord between two points on the sphere grows monotonically with
//! their great-circle distance, so the nearest neighbour in 3-D space is also
//! the geographically nearest node.

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use tracing::debug;

use crate::graph::{Node, NodeIndex};

/// KD-tree bucket size (kiddo default).
const BUCKET_SIZE: usize = 32;

/// Nearest-node index over the nodes of one graph.
pub struct NodeLocator {
    tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32>,
    len: usize,
}

impl NodeLocator {
    /// Build the index. Item values are positions in `nodes`.
    pub fn build(nodes: &[Node]) -> Self {
        let mut tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32> = KdTree::new();
        for (index, node) in nodes.iter().enumerate() {
            tree.add(&unit_vector(node.lat, node.lon), index);
        }

        debug!(node_count = nodes.len(), "built nearest-node index");

        Self {
            tree,
            len: nodes.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the node closest to `(lat, lon)`, or `None` when empty.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<NodeIndex> {
        if self.is_empty() {
            return None;
        }

        let neighbour = self
            .tree
            .nearest_one::<SquaredEuclidean>(&unit_vector(lat, lon));
        Some(neighbour.item as NodeIndex)
    }
}

impl std::fmt::Debug for NodeLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeLocator")
            .field("node_count", &self.len)
            .finish()
    }
}

fn unit_vector(lat: f64, lon: f64) -> [f64; 3] {
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}
