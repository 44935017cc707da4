//! Dynamic hierarchical cut labels with incremental repair.
//!
//! # Index
//!
//! Every cut vertex `c` of tree node `A` (see [`crate::hierarchy`]) owns two
//! *columns*: a forward search from `c` and a backward search to `c`, both
//! restricted to `V(A)`.  Together the columns of all ancestors of a
//! vertex's home form that vertex's label.  A query scans the tree nodes
//! that contain both endpoints and minimises
//! `cost(s → c) + cost(c → t)` over their cut vertices.
//!
//! # Maintenance
//!
//! A weight change on `u → v` can only affect columns of tree nodes that
//! contain both endpoints.  Of those, a forward column is affected when the
//! edge was tight before an increase, or becomes improving after a decrease;
//! backward columns use the mirrored test.  Affected columns are either
//! recomputed at once or flagged stale and recomputed by the first query
//! that reads them.  Recomputation always restarts the column from scratch,
//! so a repaired column is identical to a freshly built one.
//!
//! # Concurrency
//!
//! Deltas are applied through `&mut self`.  Queries take `&self`; each
//! column sits behind its own `RwLock` with an atomic stale flag, and lazy
//! repair computes the replacement before taking the write lock, then swaps
//! only if the column is still stale.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use rh_core::{EdgeId, NodeId};
use rh_graph::{Direction, INFINITE_WEIGHT, RoadGraph, Weight, shortest_path};
use rh_overlay::OverlayDelta;

use crate::error::{LabelError, LabelResult};
use crate::hierarchy::{PartitionTree, TreeIdx};
use crate::impact::{
    ImpactAssessment, MaintenanceReport, MaintenanceState, RepairStrategy, delta_score, validate_tau,
};
use crate::label::{Cost, LabelEngine, LabelPath, LabelStats};

// ── Columns ───────────────────────────────────────────────────────────────────

/// Restricted search result over one tree node's local vertex order.
#[derive(Clone, Debug, PartialEq)]
struct ColumnData {
    cost: Vec<Cost>,
    /// Forward: last edge into the vertex.  Backward: first edge out of it.
    via:  Vec<EdgeId>,
}

struct Column {
    tree:      TreeIdx,
    depth:     u32,
    hub:       NodeId,
    direction: Direction,
    data:      RwLock<ColumnData>,
    stale:     AtomicBool,
}

/// The column could not be read or repaired (poisoned lock).
struct ColumnUnavailable;

// ── DynamicLabels ─────────────────────────────────────────────────────────────

/// Cut-hierarchy label index that tracks the overlay incrementally.
pub struct DynamicLabels {
    graph:       Arc<RoadGraph>,
    tree:        PartitionTree,
    columns:     Vec<Column>,
    /// First column of each tree node; columns of cut vertex `i` are at
    /// `2i` (forward) and `2i + 1` (backward) from there.
    col_start:   Vec<u32>,
    weights:     Vec<Weight>,
    stale_count: AtomicUsize,
    lazy_repairs: AtomicUsize,
    build_time:  Duration,
}

impl DynamicLabels {
    /// Build the index for `weights` (indexed by `EdgeId`).
    pub fn build(graph: Arc<RoadGraph>, weights: Vec<Weight>, leaf_size: usize) -> DynamicLabels {
        let start = Instant::now();
        let tree = PartitionTree::build(&graph, leaf_size);

        let mut specs: Vec<(TreeIdx, u32, NodeId, Direction)> = Vec::with_capacity(2 * graph.node_count());
        let mut col_start = Vec::with_capacity(tree.len());
        for (a, node) in tree.nodes.iter().enumerate() {
            col_start.push(specs.len() as u32);
            for &c in &node.cut {
                specs.push((a as TreeIdx, node.depth, c, Direction::Forward));
                specs.push((a as TreeIdx, node.depth, c, Direction::Backward));
            }
        }

        let compute = |&(a, _, hub, dir): &(TreeIdx, u32, NodeId, Direction)| {
            compute_column(&graph, &tree, &weights, a, hub, dir)
        };

        #[cfg(not(feature = "parallel"))]
        let data: Vec<ColumnData> = specs.iter().map(compute).collect();

        #[cfg(feature = "parallel")]
        let data: Vec<ColumnData> = {
            use rayon::prelude::*;
            specs.par_iter().map(compute).collect()
        };

        let columns = specs
            .into_iter()
            .zip(data)
            .map(|((tree, depth, hub, direction), d)| Column {
                tree,
                depth,
                hub,
                direction,
                data: RwLock::new(d),
                stale: AtomicBool::new(false),
            })
            .collect();

        let labels = DynamicLabels {
            graph,
            tree,
            columns,
            col_start,
            weights,
            stale_count: AtomicUsize::new(0),
            lazy_repairs: AtomicUsize::new(0),
            build_time: start.elapsed(),
        };
        tracing::info!(
            nodes = labels.graph.node_count(),
            tree_nodes = labels.tree.len(),
            columns = labels.columns.len(),
            entries = labels.entry_count(),
            elapsed_ms = labels.build_time.as_secs_f64() * 1e3,
            "dynamic labels built"
        );
        labels
    }

    pub fn graph(&self) -> &Arc<RoadGraph> {
        &self.graph
    }

    pub fn tree(&self) -> &PartitionTree {
        &self.tree
    }

    /// Weights the index currently describes.
    pub fn weights(&self) -> &[Weight] {
        &self.weights
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn stale_columns(&self) -> usize {
        self.stale_count.load(Ordering::Acquire)
    }

    /// Number of columns repaired lazily by queries so far.
    pub fn lazy_repairs(&self) -> usize {
        self.lazy_repairs.load(Ordering::Relaxed)
    }

    /// `Clean` when no column is stale, otherwise `LazyRepairFlagged`.
    pub fn state(&self) -> MaintenanceState {
        if self.stale_columns() == 0 {
            MaintenanceState::Clean
        } else {
            MaintenanceState::LazyRepairFlagged
        }
    }

    pub fn entry_count(&self) -> usize {
        self.columns.iter().map(|c| self.tree.node(c.tree).vertices.len()).sum()
    }

    pub fn size_bytes(&self) -> usize {
        let per_entry = std::mem::size_of::<Cost>() + std::mem::size_of::<EdgeId>();
        self.entry_count() * per_entry
            + self.columns.len() * std::mem::size_of::<Column>()
            + self.tree.size_bytes()
    }

    // ── Maintenance ───────────────────────────────────────────────────────

    /// Apply an overlay delta: assess which columns it affects, then repair
    /// them now (`score >= tau`) or flag them for lazy repair.
    ///
    /// # Errors
    ///
    /// [`LabelError::InvalidThreshold`] when `tau` is outside `[0, 1]`; the
    /// index is left untouched.
    pub fn apply_delta(&mut self, delta: &OverlayDelta, tau: f64) -> LabelResult<MaintenanceReport> {
        let tau = validate_tau(tau)?;
        let mut transitions = vec![MaintenanceState::DisruptedPending];

        let affected = self.assess(delta);
        for change in &delta.changes {
            self.weights[change.edge.index()] = change.new_weight;
        }

        let assessment = ImpactAssessment {
            score: delta_score(delta),
            affected_columns: affected,
            total_columns: self.columns.len(),
            changed_edges: delta.changes.len(),
        };

        let (strategy, repaired, flagged) = if assessment.affected_columns.is_empty() {
            (RepairStrategy::None, 0, 0)
        } else {
            match RepairStrategy::choose(assessment.score, tau) {
                RepairStrategy::Immediate => {
                    transitions.push(MaintenanceState::ImmediateRepair);
                    let n = self.repair_now(&assessment.affected_columns);
                    (RepairStrategy::Immediate, n, 0)
                }
                _ => {
                    transitions.push(MaintenanceState::LazyRepairFlagged);
                    let n = self.flag_stale(&assessment.affected_columns);
                    (RepairStrategy::Lazy, 0, n)
                }
            }
        };

        if self.stale_columns() == 0 {
            transitions.push(MaintenanceState::Clean);
        } else if transitions.last() != Some(&MaintenanceState::LazyRepairFlagged) {
            transitions.push(MaintenanceState::LazyRepairFlagged);
        }

        tracing::info!(
            version = delta.version,
            score = assessment.score,
            tau,
            changed_edges = assessment.changed_edges,
            affected = assessment.affected_columns.len(),
            fraction = assessment.fraction_affected(),
            strategy = ?strategy,
            stale = self.stale_columns(),
            "overlay delta applied to dynamic labels"
        );

        Ok(MaintenanceReport {
            assessment,
            strategy,
            columns_repaired: repaired,
            columns_flagged: flagged,
            transitions,
        })
    }

    /// Columns whose stored costs a delta may invalidate.  Columns already
    /// stale are skipped; they are recomputed from current weights anyway.
    fn assess(&mut self, delta: &OverlayDelta) -> Vec<u32> {
        let mut hit = vec![false; self.columns.len()];
        let mut affected = Vec::new();

        for change in &delta.changes {
            let e = change.edge;
            let old = self.weights[e.index()];
            if old != change.old_weight {
                tracing::warn!(edge = %e, stored = old, reported = change.old_weight, "delta disagrees with index weights");
            }
            let new = change.new_weight;
            if old == new {
                continue;
            }
            let (u, v) = self.graph.endpoints(e);

            for a in self.tree.common_ancestors(u, v) {
                let depth = self.tree.node(a).depth;
                let (lu, lv) = (self.tree.local_index(u, depth), self.tree.local_index(v, depth));
                let start = self.col_start[a as usize] as usize;
                let end = start + 2 * self.tree.node(a).cut.len();

                for id in start..end {
                    if hit[id] {
                        continue;
                    }
                    let col = &mut self.columns[id];
                    if col.stale.load(Ordering::Acquire) {
                        continue;
                    }
                    let data = match col.data.get_mut() {
                        Ok(d) => &*d,
                        Err(poisoned) => &*poisoned.into_inner(),
                    };
                    if edge_affects(data, col.direction, lu, lv, old, new) {
                        hit[id] = true;
                        affected.push(id as u32);
                    }
                }
            }
        }
        affected.sort_unstable();
        affected
    }

    /// Recompute `ids` from current weights.  Returns the number repaired.
    fn repair_now(&mut self, ids: &[u32]) -> usize {
        let fresh = self.recompute(ids);
        let n = fresh.len();
        for (id, data) in fresh {
            let col = &mut self.columns[id as usize];
            match col.data.get_mut() {
                Ok(d) => *d = data,
                Err(poisoned) => *poisoned.into_inner() = data,
            }
            col.data.clear_poison();
            if col.stale.swap(false, Ordering::AcqRel) {
                self.stale_count.fetch_sub(1, Ordering::AcqRel);
            }
        }
        n
    }

    fn flag_stale(&mut self, ids: &[u32]) -> usize {
        let mut n = 0;
        for &id in ids {
            if !self.columns[id as usize].stale.swap(true, Ordering::AcqRel) {
                n += 1;
            }
        }
        self.stale_count.fetch_add(n, Ordering::AcqRel);
        n
    }

    fn recompute(&self, ids: &[u32]) -> Vec<(u32, ColumnData)> {
        let one = |&id: &u32| (id, self.compute(id as usize));

        #[cfg(not(feature = "parallel"))]
        {
            ids.iter().map(one).collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            ids.par_iter().map(one).collect()
        }
    }

    fn compute(&self, id: usize) -> ColumnData {
        let col = &self.columns[id];
        compute_column(&self.graph, &self.tree, &self.weights, col.tree, col.hub, col.direction)
    }

    /// Repair every stale column now.  Returns the number repaired.
    pub fn repair_all(&mut self) -> usize {
        let stale: Vec<u32> = (0..self.columns.len() as u32)
            .filter(|&id| self.columns[id as usize].stale.load(Ordering::Acquire))
            .collect();
        let n = self.repair_now(&stale);
        if n > 0 {
            tracing::info!(repaired = n, "stale columns repaired in bulk");
        }
        n
    }

    /// Lazily repair column `id` if it is stale.  Idempotent: when another
    /// query repaired it first, the fresh result is discarded.
    fn ensure_fresh(&self, id: usize) -> Result<(), ColumnUnavailable> {
        let col = &self.columns[id];
        if !col.stale.load(Ordering::Acquire) {
            return Ok(());
        }
        let fresh = self.compute(id);
        let mut guard = col.data.write().map_err(|_| ColumnUnavailable)?;
        if col.stale.swap(false, Ordering::AcqRel) {
            *guard = fresh;
            self.stale_count.fetch_sub(1, Ordering::AcqRel);
            self.lazy_repairs.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(column = id, hub = %col.hub, "column repaired lazily");
        }
        Ok(())
    }

    fn read_cost(&self, id: usize, local: usize) -> Result<Cost, ColumnUnavailable> {
        self.ensure_fresh(id)?;
        let data = self.columns[id].data.read().map_err(|_| ColumnUnavailable)?;
        Ok(data.cost[local])
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Best `(cost, backward column, forward column)` over common ancestors.
    fn best_hub(&self, s: NodeId, t: NodeId) -> Result<Option<(Cost, usize, usize)>, ColumnUnavailable> {
        let mut best: Option<(Cost, usize, usize)> = None;
        for a in self.tree.common_ancestors(s, t) {
            let node = self.tree.node(a);
            let (ls, lt) = (self.tree.local_index(s, node.depth), self.tree.local_index(t, node.depth));
            let start = self.col_start[a as usize] as usize;
            for i in 0..node.cut.len() {
                let fwd = start + 2 * i;
                let bwd = fwd + 1;
                let to_hub = self.read_cost(bwd, ls)?;
                if !to_hub.is_reachable() {
                    continue;
                }
                let from_hub = self.read_cost(fwd, lt)?;
                let total = to_hub.join(from_hub);
                if total.is_reachable() && best.is_none_or(|(c, _, _)| total < c) {
                    best = Some((total, bwd, fwd));
                }
            }
        }
        Ok(best)
    }

    /// Cost of the shortest path, or `None` when unreachable.
    pub fn cost(&self, s: NodeId, t: NodeId) -> LabelResult<Option<Cost>> {
        self.check(s)?;
        self.check(t)?;
        if s == t {
            return Ok(Some(Cost::ZERO));
        }
        match self.best_hub(s, t) {
            Ok(best) => Ok(best.map(|(c, _, _)| c)),
            Err(ColumnUnavailable) => Ok(self.fallback(s, t)?.map(|p| Cost { dist: p.distance, hops: p.hops() as u32 })),
        }
    }

    /// Shortest path from `s` to `t`.  Stale columns on the way are repaired.
    pub fn path(&self, s: NodeId, t: NodeId) -> LabelResult<LabelPath> {
        self.check(s)?;
        self.check(t)?;
        if s == t {
            return Ok(LabelPath::trivial(s));
        }
        let best = match self.best_hub(s, t) {
            Ok(best) => best,
            Err(ColumnUnavailable) => {
                return self.fallback(s, t)?.ok_or(LabelError::Unreachable { from: s, to: t });
            }
        };
        let Some((total, bwd, fwd)) = best else {
            return Err(LabelError::Unreachable { from: s, to: t });
        };

        let mut edges = self.unpack(bwd, s, true)?;
        let mut tail = self.unpack(fwd, t, false)?;
        tail.reverse();
        edges.extend(tail);

        let mut nodes = Vec::with_capacity(edges.len() + 1);
        nodes.push(s);
        nodes.extend(edges.iter().map(|e| self.graph.edge_to[e.index()]));
        if nodes.last() != Some(&t) || edges.len() as u32 != total.hops {
            tracing::error!(from = %s, to = %t, "dynamic label path does not match its cost");
            return Err(LabelError::StaleIndex(format!("path {s} → {t} does not match its label cost")));
        }
        Ok(LabelPath { distance: total.dist, edges, nodes, fallback: false })
    }

    /// Walk a column's parent edges from `from` to its hub.  Backward
    /// columns yield edges in travel order; forward columns in reverse.
    fn unpack(&self, id: usize, from: NodeId, toward_target: bool) -> LabelResult<Vec<EdgeId>> {
        let col = &self.columns[id];
        let data = col
            .data
            .read()
            .map_err(|_| LabelError::StaleIndex(format!("column {id} lock poisoned during unpacking")))?;
        let mut edges = Vec::new();
        let mut cur = from;
        let limit = data.via.len();
        while cur != col.hub {
            let e = data.via[self.tree.local_index(cur, col.depth)];
            if !e.is_valid() || edges.len() > limit {
                tracing::error!(column = id, at = %cur, "broken parent chain in label column");
                return Err(LabelError::StaleIndex(format!("broken parent chain at {cur} in column {id}")));
            }
            edges.push(e);
            cur = if toward_target { self.graph.edge_to[e.index()] } else { self.graph.edge_from[e.index()] };
        }
        Ok(edges)
    }

    /// Dijkstra over current weights, used when a column cannot be repaired.
    fn fallback(&self, s: NodeId, t: NodeId) -> LabelResult<Option<LabelPath>> {
        tracing::warn!(from = %s, to = %t, "label column unavailable, answering with Dijkstra");
        match shortest_path(&self.graph, &self.weights, s, t) {
            Ok(p) => Ok(Some(p.into())),
            Err(rh_graph::GraphError::NoRoute { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn check(&self, v: NodeId) -> LabelResult<()> {
        if v.index() < self.graph.node_count() {
            Ok(())
        } else {
            Err(LabelError::NodeOutOfRange(v))
        }
    }

    #[cfg(test)]
    pub(crate) fn poison_column(&self, id: usize) {
        let col = &self.columns[id];
        let _ = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = col.data.write();
                panic!("poisoning column for test");
            })
            .join()
        });
        if !col.stale.swap(true, Ordering::AcqRel) {
            self.stale_count.fetch_add(1, Ordering::AcqRel);
        }
    }
}

impl LabelEngine for DynamicLabels {
    fn name(&self) -> &'static str {
        "HC2L"
    }

    fn query(&self, source: NodeId, target: NodeId) -> LabelResult<LabelPath> {
        self.path(source, target)
    }

    fn stats(&self) -> LabelStats {
        LabelStats { entries: self.entry_count(), bytes: self.size_bytes(), build_time: self.build_time }
    }
}

// ── Column search ─────────────────────────────────────────────────────────────

/// Whether changing edge `u → v` from `old` to `new` may alter `data`.
fn edge_affects(data: &ColumnData, dir: Direction, lu: usize, lv: usize, old: Weight, new: Weight) -> bool {
    // Forward columns relax u → v; backward columns relax v → u.
    let (near, far) = match dir {
        Direction::Forward => (data.cost[lu], data.cost[lv]),
        Direction::Backward => (data.cost[lv], data.cost[lu]),
    };
    if !near.is_reachable() {
        return false;
    }
    if new > old {
        old != INFINITE_WEIGHT && near.step(old) == far
    } else {
        new != INFINITE_WEIGHT && near.step(new) <= far
    }
}

/// Search from (or to) `hub` restricted to `V(a)`.
fn compute_column(
    graph: &RoadGraph,
    tree: &PartitionTree,
    weights: &[Weight],
    a: TreeIdx,
    hub: NodeId,
    dir: Direction,
) -> ColumnData {
    let node = tree.node(a);
    let depth = node.depth;
    let m = node.vertices.len();
    let mut cost = vec![Cost::UNREACHABLE; m];
    let mut via = vec![EdgeId::INVALID; m];
    let mut done = vec![false; m];

    let root = tree.local_index(hub, depth);
    cost[root] = Cost::ZERO;
    let mut heap: BinaryHeap<Reverse<(Cost, u32)>> = BinaryHeap::new();
    heap.push(Reverse((Cost::ZERO, root as u32)));

    while let Some(Reverse((c, li))) = heap.pop() {
        let li = li as usize;
        if done[li] {
            continue;
        }
        done[li] = true;
        let v = node.vertices[li];
        for (e, next) in graph.neighbors(v, dir) {
            let w = weights[e.index()];
            if w == INFINITE_WEIGHT || !tree.contains(a, next) {
                continue;
            }
            let ln = tree.local_index(next, depth);
            if done[ln] {
                continue;
            }
            let nc = c.step(w);
            if nc < cost[ln] {
                cost[ln] = nc;
                via[ln] = e;
                heap.push(Reverse((nc, ln as u32)));
            }
        }
    }
    ColumnData { cost, via }
}
