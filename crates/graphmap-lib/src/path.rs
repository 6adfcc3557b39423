//! Shortest-path search over the road graph.
//!
//! Dijkstra and A* share one best-first search; A* takes its lower bound from
//! a [`LandmarkTable`]. Between two nodes only the first recorded edge is
//! travelled, the same edge route assembly reads lengths and geometry from.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::graph::{Graph, NodeIndex};
use crate::landmarks::LandmarkTable;

/// Which edge direction a single-source search follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Distances from the source along outgoing edges.
    Forward,
    /// Distances to the source, following incoming edges backwards.
    Backward,
}

/// Run Dijkstra's algorithm from `start` to `goal` using edge lengths.
pub fn find_route_dijkstra(
    graph: &Graph,
    start: NodeIndex,
    goal: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    search(graph, start, goal, |_| 0.0)
}

/// Run A* guided by the landmark (ALT) lower bound towards `goal`.
///
/// With an empty table the heuristic is zero and the search behaves like
/// Dijkstra.
pub fn find_route_alt(
    graph: &Graph,
    start: NodeIndex,
    goal: NodeIndex,
    table: &LandmarkTable,
) -> Option<Vec<NodeIndex>> {
    let heuristic = table.heuristic_to(graph.node(goal).id);
    search(graph, start, goal, |node| {
        heuristic.estimate(graph.node(node).id)
    })
}

/// Best-first search shared by Dijkstra (zero heuristic) and A*.
///
/// Nodes may be reopened when a cheaper path shows up, which keeps the result
/// optimal for any admissible heuristic.
fn search<H>(
    graph: &Graph,
    start: NodeIndex,
    goal: NodeIndex,
    heuristic: H,
) -> Option<Vec<NodeIndex>>
where
    H: Fn(NodeIndex) -> f64,
{
    if start == goal {
        return Some(vec![start]);
    }

    let mut g_score: HashMap<NodeIndex, f64> = HashMap::new();
    let mut parents: HashMap<NodeIndex, Option<NodeIndex>> = HashMap::new();
    let mut queue = BinaryHeap::new();
    let mut sequence = 0u64;

    g_score.insert(start, 0.0);
    parents.insert(start, None);
    queue.push(QueueEntry::new(start, 0.0, heuristic(start), sequence));

    while let Some(entry) = queue.pop() {
        let current_score = match g_score.get(&entry.node) {
            Some(score) if *score < entry.cost.0 => continue,
            Some(score) => *score,
            None => continue,
        };

        if entry.node == goal {
            return Some(reconstruct_path(&parents, start, goal));
        }

        for edge in graph.links_from(entry.node) {
            let next = edge.target;
            let tentative = current_score + edge.length;
            if tentative < *g_score.get(&next).unwrap_or(&f64::INFINITY) {
                g_score.insert(next, tentative);
                parents.insert(next, Some(entry.node));
                sequence += 1;
                queue.push(QueueEntry::new(next, tentative, heuristic(next), sequence));
            }
        }
    }

    None
}

/// Shortest distance from (or to) `source` for every node of the graph.
///
/// Unreachable nodes are reported as `f64::INFINITY`. The result is indexed by
/// [`NodeIndex`].
pub fn shortest_path_lengths(graph: &Graph, source: NodeIndex, direction: Direction) -> Vec<f64> {
    let mut distances = vec![f64::INFINITY; graph.node_count()];
    let mut queue = BinaryHeap::new();
    let mut sequence = 0u64;

    distances[source as usize] = 0.0;
    queue.push(QueueEntry::new(source, 0.0, 0.0, sequence));

    while let Some(entry) = queue.pop() {
        let current = distances[entry.node as usize];
        if current < entry.cost.0 {
            continue;
        }

        let mut relax = |next: NodeIndex, length: f64| {
            let candidate = current + length;
            if candidate < distances[next as usize] {
                distances[next as usize] = candidate;
                sequence += 1;
                queue.push(QueueEntry::new(next, candidate, 0.0, sequence));
            }
        };

        match direction {
            Direction::Forward => {
                for edge in graph.links_from(entry.node) {
                    relax(edge.target, edge.length);
                }
            }
            Direction::Backward => {
                for edge in graph.links_to(entry.node) {
                    relax(edge.source, edge.length);
                }
            }
        }
    }

    distances
}

fn reconstruct_path(
    parents: &HashMap<NodeIndex, Option<NodeIndex>>,
    start: NodeIndex,
    goal: NodeIndex,
) -> Vec<NodeIndex> {
    let mut path = Vec::new();
    let mut current = Some(goal);
    while let Some(node) = current {
        path.push(node);
        if node == start {
            break;
        }
        current = parents.get(&node).copied().flatten();
    }
    path.reverse();
    path
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Priority queue entry. `cost` is the path length so far, `estimate` adds the
/// heuristic. `sequence` records insertion order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    node: NodeIndex,
    cost: FloatOrd,
    estimate: FloatOrd,
    sequence: u64,
}

impl QueueEntry {
    fn new(node: NodeIndex, cost: f64, heuristic: f64, sequence: u64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
            estimate: FloatOrd(cost + heuristic),
            sequence,
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap; equal estimates
        // pop in insertion order.
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
