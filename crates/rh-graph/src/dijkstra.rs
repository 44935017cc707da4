//! Reference Dijkstra over materialised edge weights.
//!
//! The labeling engines never call this on the query hot path.  It backs
//! three things: the fallback when a lazily repaired column cannot be
//! obtained, verification in tests, and the baseline for
//! rebuild-equivalence checks.
//!
//! # Cost units
//!
//! Costs are [`Weight`]s (milliseconds).  Edges weighing
//! [`INFINITE_WEIGHT`] are skipped.  Among equal-cost paths the one with the
//! fewest edges wins, matching the tie rule of the label queries.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rh_core::{EdgeId, NodeId};

use crate::error::{GraphError, GraphResult};
use crate::network::{Direction, RoadGraph};
use crate::weight::{INFINITE_WEIGHT, Weight, add_weight};

// ── PathSearch ────────────────────────────────────────────────────────────────

/// A single shortest path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSearch {
    /// Total cost in milliseconds.
    pub distance: Weight,
    /// Edges from source to target, in travel order.
    pub edges: Vec<EdgeId>,
    /// Nodes from source to target inclusive.
    pub nodes: Vec<NodeId>,
}

impl PathSearch {
    pub fn hops(&self) -> usize {
        self.edges.len()
    }
}

/// Distances from (or to) one source.
#[derive(Debug, Clone)]
pub struct SearchTree {
    pub dist: Vec<Weight>,
    pub hops: Vec<u32>,
    /// Edge through which each node was settled; `INVALID` for the source
    /// and unreached nodes.
    pub via: Vec<EdgeId>,
}

// ── Searches ──────────────────────────────────────────────────────────────────

/// Shortest path from `from` to `to` under `weights` (indexed by `EdgeId`).
///
/// # Errors
///
/// [`GraphError::NodeNotFound`] for an out-of-range node, and
/// [`GraphError::NoRoute`] when `to` is unreachable.
pub fn shortest_path(
    graph: &RoadGraph,
    weights: &[Weight],
    from: NodeId,
    to: NodeId,
) -> GraphResult<PathSearch> {
    for n in [from, to] {
        if n.index() >= graph.node_count() {
            return Err(GraphError::NodeNotFound(n));
        }
    }
    let tree = run(graph, weights, from, Direction::Forward, Some(to));
    if tree.dist[to.index()] == INFINITE_WEIGHT {
        return Err(GraphError::NoRoute { from, to });
    }

    let mut edges = Vec::with_capacity(tree.hops[to.index()] as usize);
    let mut cur = to;
    while cur != from {
        let e = tree.via[cur.index()];
        edges.push(e);
        cur = graph.edge_from[e.index()];
    }
    edges.reverse();

    let mut nodes = Vec::with_capacity(edges.len() + 1);
    nodes.push(from);
    nodes.extend(edges.iter().map(|e| graph.edge_to[e.index()]));

    Ok(PathSearch { distance: tree.dist[to.index()], edges, nodes })
}

/// Full single-source search.  `Direction::Backward` yields distances *to*
/// `source` by following incoming edges.
pub fn one_to_all(
    graph: &RoadGraph,
    weights: &[Weight],
    source: NodeId,
    direction: Direction,
) -> SearchTree {
    run(graph, weights, source, direction, None)
}

fn run(
    graph: &RoadGraph,
    weights: &[Weight],
    source: NodeId,
    direction: Direction,
    target: Option<NodeId>,
) -> SearchTree {
    let n = graph.node_count();
    let mut dist = vec![INFINITE_WEIGHT; n];
    let mut hops = vec![u32::MAX; n];
    let mut via  = vec![EdgeId::INVALID; n];
    let mut done = vec![false; n];

    dist[source.index()] = 0;
    hops[source.index()] = 0;

    // Min-heap keyed by (cost, hops, node) so ties settle deterministically.
    let mut heap: BinaryHeap<Reverse<(Weight, u32, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((0, 0, source)));

    while let Some(Reverse((cost, h, node))) = heap.pop() {
        if done[node.index()] {
            continue;
        }
        done[node.index()] = true;
        if Some(node) == target {
            break;
        }

        for (edge, next) in graph.neighbors(node, direction) {
            let w = weights[edge.index()];
            if w == INFINITE_WEIGHT || done[next.index()] {
                continue;
            }
            let nd = add_weight(cost, w);
            if nd == INFINITE_WEIGHT {
                continue;
            }
            let nh = h + 1;
            if (nd, nh) < (dist[next.index()], hops[next.index()]) {
                dist[next.index()] = nd;
                hops[next.index()] = nh;
                via[next.index()] = edge;
                heap.push(Reverse((nd, nh, next)));
            }
        }
    }

    SearchTree { dist, hops, via }
}
