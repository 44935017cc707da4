//! Types shared by both label engines.

use std::time::Duration;

use rh_core::{EdgeId, NodeId};
use rh_graph::{INFINITE_WEIGHT, PathSearch, Weight, add_weight};

use crate::error::LabelResult;

// ── Cost ──────────────────────────────────────────────────────────────────────

/// Path cost ordered by distance, then by number of edges.
///
/// Every search and label comparison in this crate uses this order, so two
/// engines answering the same query agree on distance *and* on the tie rule.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost {
    pub dist: Weight,
    pub hops: u32,
}

impl Cost {
    pub const ZERO: Cost = Cost { dist: 0, hops: 0 };
    pub const UNREACHABLE: Cost = Cost { dist: INFINITE_WEIGHT, hops: u32::MAX };

    #[inline]
    pub fn is_reachable(self) -> bool {
        self.dist != INFINITE_WEIGHT
    }

    /// Extend by one edge of weight `w`.  Stays unreachable when either side is.
    #[inline]
    pub fn step(self, w: Weight) -> Cost {
        let dist = add_weight(self.dist, w);
        if dist == INFINITE_WEIGHT {
            Cost::UNREACHABLE
        } else {
            Cost { dist, hops: self.hops + 1 }
        }
    }

    /// Concatenate two path costs.
    #[inline]
    pub fn join(self, other: Cost) -> Cost {
        let dist = add_weight(self.dist, other.dist);
        if dist == INFINITE_WEIGHT {
            Cost::UNREACHABLE
        } else {
            Cost { dist, hops: self.hops + other.hops }
        }
    }
}

// ── LabelPath ─────────────────────────────────────────────────────────────────

/// A shortest path answered by a label engine.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelPath {
    /// Total travel time in milliseconds.
    pub distance: Weight,
    pub edges:    Vec<EdgeId>,
    /// Source to target inclusive.
    pub nodes:    Vec<NodeId>,
    /// The path came from a Dijkstra fallback rather than the labels.
    pub fallback: bool,
}

impl LabelPath {
    pub fn trivial(node: NodeId) -> Self {
        Self { distance: 0, edges: Vec::new(), nodes: vec![node], fallback: false }
    }

    pub fn hops(&self) -> usize {
        self.edges.len()
    }
}

impl From<PathSearch> for LabelPath {
    fn from(p: PathSearch) -> Self {
        Self { distance: p.distance, edges: p.edges, nodes: p.nodes, fallback: true }
    }
}

// ── Stats ─────────────────────────────────────────────────────────────────────

/// Size and build cost of a label index.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LabelStats {
    /// Number of stored (node, hub) distance entries.
    pub entries:    usize,
    /// Approximate heap footprint of the index in bytes.
    pub bytes:      usize,
    /// Wall time of the most recent full build.
    pub build_time: Duration,
}

// ── Engine seam ───────────────────────────────────────────────────────────────

/// A point-to-point shortest-path oracle backed by precomputed labels.
pub trait LabelEngine: Send + Sync {
    /// Short name used in results and logs.
    fn name(&self) -> &'static str;

    /// Shortest path from `source` to `target` under the weights the index
    /// was built or repaired for.
    fn query(&self, source: NodeId, target: NodeId) -> LabelResult<LabelPath>;

    fn stats(&self) -> LabelStats;
}
