//! Static hub labels built by pruned landmark labeling.
//!
//! # Construction
//!
//! Nodes are ranked by total degree (descending, ties by id).  Each node in
//! rank order runs a forward and a backward search; a reached node is only
//! labeled if the labels built so far cannot already certify its cost, and
//! its search stops expanding there.  Labels are therefore appended in rank
//! order and stay sorted, so a query is a linear merge of two lists.
//!
//! # Invalidation
//!
//! There is no incremental update.  [`StaticEngine`] remembers the overlay
//! version its labels were built for and rebuilds from scratch whenever the
//! version moves.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use rh_core::{EdgeId, NodeId};
use rh_graph::{Direction, INFINITE_WEIGHT, RoadGraph, Weight};
use rh_overlay::DisruptionOverlay;

use crate::error::{LabelError, LabelResult};
use crate::label::{Cost, LabelEngine, LabelPath, LabelStats};

// ── Label entries ─────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
struct Entry {
    hub:  u32, // rank of the hub
    cost: Cost,
    /// Out-labels: first edge from the owner toward the hub.
    /// In-labels: last edge from the hub into the owner.
    via:  EdgeId,
}

// ── HubLabels ─────────────────────────────────────────────────────────────────

/// Complete two-sided hub labeling of one weight assignment.
pub struct HubLabels {
    /// `out_labels[v]`: costs from `v` to hubs, sorted by hub rank.
    out_labels: Vec<Vec<Entry>>,
    /// `in_labels[v]`: costs from hubs to `v`, sorted by hub rank.
    in_labels:  Vec<Vec<Entry>>,
    edge_from:  Vec<NodeId>,
    edge_to:    Vec<NodeId>,
    build_time: Duration,
}

impl HubLabels {
    /// Label `graph` under `weights` (indexed by `EdgeId`).
    pub fn build(graph: &RoadGraph, weights: &[Weight]) -> HubLabels {
        let start = Instant::now();
        let n = graph.node_count();

        let mut order: Vec<NodeId> = (0..n as u32).map(NodeId).collect();
        order.sort_by_key(|&v| (Reverse(graph.out_degree(v) + graph.in_degree(v)), v));

        let mut out_labels: Vec<Vec<Entry>> = vec![Vec::new(); n];
        let mut in_labels:  Vec<Vec<Entry>> = vec![Vec::new(); n];

        // Scratch reused across hubs.
        let mut hub_cost = vec![Cost::UNREACHABLE; n];
        let mut search = Search::new(n);

        for (rank, &hub) in order.iter().enumerate() {
            let rank = rank as u32;

            // Forward: hub → v, stored in in_labels[v].
            for e in &out_labels[hub.index()] {
                hub_cost[e.hub as usize] = e.cost;
            }
            search.run(graph, weights, hub, Direction::Forward, |v, cost, via| {
                let known = certified(&hub_cost, &in_labels[v.index()]);
                if known <= cost {
                    return false;
                }
                in_labels[v.index()].push(Entry { hub: rank, cost, via });
                true
            });
            for e in &out_labels[hub.index()] {
                hub_cost[e.hub as usize] = Cost::UNREACHABLE;
            }

            // Backward: v → hub, stored in out_labels[v].
            for e in &in_labels[hub.index()] {
                hub_cost[e.hub as usize] = e.cost;
            }
            search.run(graph, weights, hub, Direction::Backward, |v, cost, via| {
                let known = certified(&hub_cost, &out_labels[v.index()]);
                if known <= cost {
                    return false;
                }
                out_labels[v.index()].push(Entry { hub: rank, cost, via });
                true
            });
            for e in &in_labels[hub.index()] {
                hub_cost[e.hub as usize] = Cost::UNREACHABLE;
            }
        }

        let labels = HubLabels {
            out_labels,
            in_labels,
            edge_from: graph.edge_from.clone(),
            edge_to: graph.edge_to.clone(),
            build_time: start.elapsed(),
        };
        tracing::info!(
            nodes = n,
            entries = labels.entry_count(),
            elapsed_ms = labels.build_time.as_secs_f64() * 1e3,
            "static hub labels built"
        );
        labels
    }

    pub fn node_count(&self) -> usize {
        self.out_labels.len()
    }

    pub fn entry_count(&self) -> usize {
        self.out_labels.iter().chain(&self.in_labels).map(Vec::len).sum()
    }

    pub fn size_bytes(&self) -> usize {
        let lists = 2 * self.out_labels.len() * std::mem::size_of::<Vec<Entry>>();
        let entries: usize = self
            .out_labels
            .iter()
            .chain(&self.in_labels)
            .map(|l| l.capacity() * std::mem::size_of::<Entry>())
            .sum();
        lists + entries
    }

    /// Best common hub of `s` and `t`: `(cost, out entry, in entry)`.
    fn best_hub(&self, s: NodeId, t: NodeId) -> Option<(Cost, Entry, Entry)> {
        let (a, b) = (&self.out_labels[s.index()], &self.in_labels[t.index()]);
        let (mut i, mut j) = (0, 0);
        let mut best: Option<(Cost, Entry, Entry)> = None;
        while i < a.len() && j < b.len() {
            match a[i].hub.cmp(&b[j].hub) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    let c = a[i].cost.join(b[j].cost);
                    if c.is_reachable() && best.is_none_or(|(bc, _, _)| c < bc) {
                        best = Some((c, a[i], b[j]));
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        best
    }

    /// Cost of the shortest path, or `None` when unreachable.
    pub fn cost(&self, s: NodeId, t: NodeId) -> Option<Cost> {
        if s == t {
            return Some(Cost::ZERO);
        }
        self.best_hub(s, t).map(|(c, _, _)| c)
    }

    /// Shortest path from `s` to `t`.
    ///
    /// The path is unpacked one edge at a time: each step follows the first
    /// edge toward the best hub (or the last edge from it) and re-queries
    /// the shorter remainder.
    pub fn path(&self, s: NodeId, t: NodeId) -> LabelResult<LabelPath> {
        for n in [s, t] {
            if n.index() >= self.node_count() {
                return Err(LabelError::NodeOutOfRange(n));
            }
        }
        if s == t {
            return Ok(LabelPath::trivial(s));
        }
        let Some((total, _, _)) = self.best_hub(s, t) else {
            return Err(LabelError::Unreachable { from: s, to: t });
        };

        let mut front: Vec<EdgeId> = Vec::new();
        let mut back:  Vec<EdgeId> = Vec::new();
        let (mut u, mut v) = (s, t);
        while u != v {
            let Some((_, out, inn)) = self.best_hub(u, v) else {
                tracing::error!(from = %u, to = %v, "static labels lost a path during unpacking");
                return Err(LabelError::StaleIndex(format!("no hub between {u} and {v} while unpacking")));
            };
            if out.via.is_valid() {
                front.push(out.via);
                u = self.edge_to[out.via.index()];
            } else if inn.via.is_valid() {
                back.push(inn.via);
                v = self.edge_from[inn.via.index()];
            } else {
                return Err(LabelError::StaleIndex(format!("hub of {u} and {v} has no parent edge")));
            }
        }

        back.reverse();
        front.extend(back);
        let mut nodes = Vec::with_capacity(front.len() + 1);
        nodes.push(s);
        nodes.extend(front.iter().map(|e| self.edge_to[e.index()]));
        Ok(LabelPath { distance: total.dist, edges: front, nodes, fallback: false })
    }
}

/// Lowest cost certified by the current hub's labels joined with `labels`.
#[inline]
fn certified(hub_cost: &[Cost], labels: &[Entry]) -> Cost {
    labels
        .iter()
        .map(|e| hub_cost[e.hub as usize].join(e.cost))
        .min()
        .unwrap_or(Cost::UNREACHABLE)
}

// ── Pruned Dijkstra ───────────────────────────────────────────────────────────

/// Reusable search state; only touched entries are reset between runs.
struct Search {
    cost:    Vec<Cost>,
    via:     Vec<EdgeId>,
    touched: Vec<NodeId>,
    heap:    BinaryHeap<Reverse<(Cost, NodeId)>>,
}

impl Search {
    fn new(n: usize) -> Self {
        Self {
            cost: vec![Cost::UNREACHABLE; n],
            via: vec![EdgeId::INVALID; n],
            touched: Vec::new(),
            heap: BinaryHeap::new(),
        }
    }

    /// Run from `root`.  `visit(v, cost, via)` returns `false` to prune `v`.
    fn run<F>(&mut self, graph: &RoadGraph, weights: &[Weight], root: NodeId, dir: Direction, mut visit: F)
    where
        F: FnMut(NodeId, Cost, EdgeId) -> bool,
    {
        self.cost[root.index()] = Cost::ZERO;
        self.touched.push(root);
        self.heap.push(Reverse((Cost::ZERO, root)));

        while let Some(Reverse((c, v))) = self.heap.pop() {
            if c > self.cost[v.index()] {
                continue;
            }
            if !visit(v, c, self.via[v.index()]) {
                continue;
            }
            for (e, next) in graph.neighbors(v, dir) {
                let w = weights[e.index()];
                if w == INFINITE_WEIGHT {
                    continue;
                }
                let nc = c.step(w);
                if nc < self.cost[next.index()] {
                    if self.cost[next.index()] == Cost::UNREACHABLE {
                        self.touched.push(next);
                    }
                    self.cost[next.index()] = nc;
                    self.via[next.index()] = e;
                    self.heap.push(Reverse((nc, next)));
                }
            }
        }

        for v in self.touched.drain(..) {
            self.cost[v.index()] = Cost::UNREACHABLE;
            self.via[v.index()] = EdgeId::INVALID;
        }
    }
}

// ── StaticEngine ──────────────────────────────────────────────────────────────

/// Static labels cached per overlay version.
///
/// Any overlay change invalidates the cache; the next access rebuilds the
/// whole labeling.
pub struct StaticEngine {
    cache: RwLock<Option<(u64, Arc<HubLabels>)>>,
}

impl StaticEngine {
    pub fn new() -> Self {
        Self { cache: RwLock::new(None) }
    }

    /// Labels for the overlay's current version, rebuilding if needed.
    /// Returns the labels and whether a rebuild happened.
    pub fn labels_for(&self, graph: &RoadGraph, overlay: &DisruptionOverlay) -> (Arc<HubLabels>, bool) {
        let version = overlay.version();
        if let Ok(guard) = self.cache.read() {
            if let Some((v, labels)) = guard.as_ref() {
                if *v == version {
                    return (Arc::clone(labels), false);
                }
            }
        }

        let weights = graph.weights(overlay);
        let labels = Arc::new(HubLabels::build(graph, &weights));
        match self.cache.write() {
            Ok(mut guard) => *guard = Some((version, Arc::clone(&labels))),
            Err(poisoned) => *poisoned.into_inner() = Some((version, Arc::clone(&labels))),
        }
        tracing::debug!(version, "static labels rebuilt for overlay version");
        (labels, true)
    }
}

impl Default for StaticEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelEngine for HubLabels {
    fn name(&self) -> &'static str {
        "DHL"
    }

    fn query(&self, source: NodeId, target: NodeId) -> LabelResult<LabelPath> {
        self.path(source, target)
    }

    fn stats(&self) -> LabelStats {
        LabelStats { entries: self.entry_count(), bytes: self.size_bytes(), build_time: self.build_time }
    }
}
