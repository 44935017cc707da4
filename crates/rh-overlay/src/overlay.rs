//! The disruption overlay.
//!
//! # Model
//!
//! Every admitted disruption is kept (for listing), but only the most severe
//! one on each edge determines that edge's slowdown.  The overlay maintains
//! that per-edge winner incrementally: each mutation recomputes the winner
//! only for the edges it touches, and reports every edge whose effective
//! slowdown actually changed as an [`EdgeChange`].
//!
//! # Versioning
//!
//! `version` increases by one on every mutation that changes the disruption
//! set.  Engines that cannot repair incrementally compare versions to decide
//! when to rebuild.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use rh_core::{DisruptionId, EdgeId, Timestamp};
use rh_graph::{EdgeSlowdown, RoadGraph, Slowdown, Weight};

use crate::disruption::{Disruption, NewDisruption};
use crate::error::{OverlayError, OverlayResult};
use crate::table::SlowdownTable;

// ── Delta types ───────────────────────────────────────────────────────────────

/// One edge whose effective slowdown changed.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeChange {
    pub edge:       EdgeId,
    pub before:     Option<Slowdown>,
    pub after:      Option<Slowdown>,
    pub old_weight: Weight,
    pub new_weight: Weight,
}

impl EdgeChange {
    pub fn is_increase(&self) -> bool {
        self.new_weight > self.old_weight
    }
}

/// Whether a disruption entered or left the overlay.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeltaKind {
    Added,
    Removed,
}

/// Severity inputs of one disruption carried by a delta.
#[derive(Clone, Debug, PartialEq)]
pub struct DisruptionEffect {
    pub id:          DisruptionId,
    pub kind:        DeltaKind,
    pub ratio:       f64,
    pub jam_factor:  f64,
    pub closes_road: bool,
}

/// Result of one overlay mutation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayDelta {
    /// Overlay version after the mutation.
    pub version:     u64,
    pub disruptions: Vec<DisruptionEffect>,
    /// Edges whose effective slowdown changed, sorted by edge id.
    pub changes:     Vec<EdgeChange>,
}

impl OverlayDelta {
    pub fn is_empty(&self) -> bool {
        self.disruptions.is_empty() && self.changes.is_empty()
    }

    /// Ids of disruptions added by this mutation, in insertion order.
    pub fn added(&self) -> impl Iterator<Item = DisruptionId> + '_ {
        self.disruptions.iter().filter(|d| d.kind == DeltaKind::Added).map(|d| d.id)
    }

    /// Fold `other` into `self`, keeping one change per edge (first `before`,
    /// last `after`).  Edges that end up unchanged are dropped.
    pub fn merge(&mut self, other: OverlayDelta) {
        self.version = self.version.max(other.version);
        self.disruptions.extend(other.disruptions);
        for c in other.changes {
            match self.changes.binary_search_by_key(&c.edge, |x| x.edge) {
                Ok(i) => {
                    self.changes[i].after = c.after;
                    self.changes[i].new_weight = c.new_weight;
                }
                Err(i) => self.changes.insert(i, c),
            }
        }
        self.changes.retain(|c| c.before != c.after);
    }
}

// ── DisruptionOverlay ─────────────────────────────────────────────────────────

/// Set of active disruptions plus the per-edge effective slowdown.
pub struct DisruptionOverlay {
    table:       SlowdownTable,
    disruptions: BTreeMap<DisruptionId, Disruption>,
    /// All disruptions covering each edge.
    by_edge:     FxHashMap<EdgeId, Vec<DisruptionId>>,
    /// Winning disruption per disrupted edge.
    winner:      FxHashMap<EdgeId, DisruptionId>,
    next_id:     u64,
    version:     u64,
}

impl DisruptionOverlay {
    pub fn new(table: SlowdownTable) -> Self {
        Self {
            table,
            disruptions: BTreeMap::new(),
            by_edge: FxHashMap::default(),
            winner: FxHashMap::default(),
            next_id: 1,
            version: 0,
        }
    }

    pub fn table(&self) -> &SlowdownTable {
        &self.table
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.disruptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disruptions.is_empty()
    }

    pub fn get(&self, id: DisruptionId) -> Option<&Disruption> {
        self.disruptions.get(&id)
    }

    /// All disruptions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Disruption> {
        self.disruptions.values()
    }

    /// The disruption that determines `edge`'s slowdown, if any.
    pub fn active_for(&self, edge: EdgeId) -> Option<&Disruption> {
        self.winner.get(&edge).and_then(|id| self.disruptions.get(id))
    }

    /// Every disrupted edge with its effective slowdown, sorted by edge.
    pub fn disrupted_edges(&self) -> Vec<(EdgeId, Slowdown)> {
        let mut v: Vec<(EdgeId, Slowdown)> = self
            .winner
            .iter()
            .filter_map(|(&e, id)| self.disruptions.get(id).map(|d| (e, d.slowdown())))
            .collect();
        v.sort_unstable_by_key(|(e, _)| *e);
        v
    }

    // ── Mutations ─────────────────────────────────────────────────────────

    /// Admit a disruption and return the resulting delta.
    ///
    /// # Errors
    ///
    /// Target resolution errors, or an out-of-range ratio or jam factor.
    /// A rejected report leaves the overlay untouched.
    pub fn add(&mut self, graph: &RoadGraph, new: NewDisruption) -> OverlayResult<OverlayDelta> {
        let disruption = self.admit(graph, new)?;
        let id = disruption.id;
        let edges = disruption.edges.clone();
        let effect = effect_of(&disruption, DeltaKind::Added);

        let before = self.snapshot(&edges);
        self.disruptions.insert(id, disruption);
        for &e in &edges {
            self.by_edge.entry(e).or_default().push(id);
        }
        self.refresh_winners(&edges);

        self.version += 1;
        let delta = self.delta(graph, before, vec![effect]);
        tracing::debug!(disruption = %id, edges = edges.len(), changed = delta.changes.len(), version = self.version, "disruption added");
        Ok(delta)
    }

    /// Admit several disruptions as one mutation.  Stops at the first
    /// invalid report; reports admitted before it stay admitted.
    pub fn add_all(
        &mut self,
        graph: &RoadGraph,
        batch: impl IntoIterator<Item = NewDisruption>,
    ) -> OverlayResult<OverlayDelta> {
        let mut merged = OverlayDelta { version: self.version, ..OverlayDelta::default() };
        for new in batch {
            let delta = self.add(graph, new)?;
            merged.merge(delta);
        }
        Ok(merged)
    }

    /// Remove one disruption.  Removing an unknown id is a no-op that
    /// returns an empty delta and leaves the version unchanged.
    pub fn remove(&mut self, graph: &RoadGraph, id: DisruptionId) -> OverlayDelta {
        self.remove_many(graph, &[id])
    }

    /// Remove every disruption whose expiry is at or before `now`.
    pub fn expire(&mut self, graph: &RoadGraph, now: Timestamp) -> OverlayDelta {
        let expired: Vec<DisruptionId> = self
            .disruptions
            .values()
            .filter(|d| !d.is_active(now))
            .map(|d| d.id)
            .collect();
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), now = %now, "disruptions expired");
        }
        self.remove_many(graph, &expired)
    }

    /// Remove all disruptions.
    pub fn clear(&mut self, graph: &RoadGraph) -> OverlayDelta {
        let all: Vec<DisruptionId> = self.disruptions.keys().copied().collect();
        self.remove_many(graph, &all)
    }

    fn remove_many(&mut self, graph: &RoadGraph, ids: &[DisruptionId]) -> OverlayDelta {
        let present: Vec<DisruptionId> = ids.iter().copied().filter(|id| self.disruptions.contains_key(id)).collect();
        if present.is_empty() {
            return OverlayDelta { version: self.version, ..OverlayDelta::default() };
        }

        let touched: Vec<EdgeId> = {
            let mut set = FxHashSet::default();
            for id in &present {
                if let Some(d) = self.disruptions.get(id) {
                    set.extend(d.edges.iter().copied());
                }
            }
            let mut v: Vec<EdgeId> = set.into_iter().collect();
            v.sort_unstable();
            v
        };

        let before = self.snapshot(&touched);
        let mut effects = Vec::with_capacity(present.len());
        for id in &present {
            if let Some(d) = self.disruptions.remove(id) {
                for e in &d.edges {
                    if let Some(list) = self.by_edge.get_mut(e) {
                        list.retain(|x| x != id);
                        if list.is_empty() {
                            self.by_edge.remove(e);
                        }
                    }
                }
                effects.push(effect_of(&d, DeltaKind::Removed));
            }
        }
        self.refresh_winners(&touched);

        self.version += 1;
        let delta = self.delta(graph, before, effects);
        tracing::debug!(removed = present.len(), changed = delta.changes.len(), version = self.version, "disruptions removed");
        delta
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn admit(&mut self, graph: &RoadGraph, new: NewDisruption) -> OverlayResult<Disruption> {
        let edges = new.target.resolve(graph)?;
        let ratio = new.ratio.unwrap_or_else(|| self.table.ratio(new.severity));
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(OverlayError::InvalidRatio(ratio));
        }
        let jam_factor = new
            .jam_factor
            .unwrap_or_else(|| SlowdownTable::jam_factor(ratio, new.closes_road));
        if !(0.0..=10.0).contains(&jam_factor) {
            return Err(OverlayError::InvalidJamFactor(jam_factor));
        }

        let road_name = if new.road_name.is_empty() {
            graph.road_name(edges[0]).to_owned()
        } else {
            new.road_name
        };

        let id = DisruptionId(self.next_id);
        self.next_id += 1;
        Ok(Disruption {
            id,
            edges,
            incident_type: new.incident_type,
            severity: new.severity,
            ratio,
            jam_factor,
            closes_road: new.closes_road,
            reported_at: new.reported_at,
            expires_at: new.expires_at,
            road_name,
            description: new.description,
        })
    }

    fn snapshot(&self, edges: &[EdgeId]) -> Vec<(EdgeId, Option<Slowdown>)> {
        edges.iter().map(|&e| (e, self.slowdown(e))).collect()
    }

    fn refresh_winners(&mut self, edges: &[EdgeId]) {
        for &e in edges {
            let best = self.by_edge.get(&e).and_then(|ids| {
                ids.iter()
                    .filter_map(|id| self.disruptions.get(id))
                    .min_by(|a, b| a.severity_order(b))
                    .map(|d| d.id)
            });
            match best {
                Some(id) => {
                    self.winner.insert(e, id);
                }
                None => {
                    self.winner.remove(&e);
                }
            }
        }
    }

    fn delta(
        &self,
        graph: &RoadGraph,
        before: Vec<(EdgeId, Option<Slowdown>)>,
        disruptions: Vec<DisruptionEffect>,
    ) -> OverlayDelta {
        let mut changes: Vec<EdgeChange> = before
            .into_iter()
            .filter_map(|(edge, before)| {
                let after = self.slowdown(edge);
                if before == after {
                    return None;
                }
                let base = graph.edge_travel_ms[edge.index()];
                Some(EdgeChange {
                    edge,
                    before,
                    after,
                    old_weight: before.map_or(base, |s| s.apply(base)),
                    new_weight: after.map_or(base, |s| s.apply(base)),
                })
            })
            .collect();
        changes.sort_unstable_by_key(|c| c.edge);
        OverlayDelta { version: self.version, disruptions, changes }
    }
}

impl Default for DisruptionOverlay {
    fn default() -> Self {
        Self::new(SlowdownTable::default())
    }
}

impl EdgeSlowdown for DisruptionOverlay {
    #[inline]
    fn slowdown(&self, edge: EdgeId) -> Option<Slowdown> {
        self.active_for(edge).map(Disruption::slowdown)
    }
}

fn effect_of(d: &Disruption, kind: DeltaKind) -> DisruptionEffect {
    DisruptionEffect {
        id: d.id,
        kind,
        ratio: d.ratio,
        jam_factor: d.jam_factor,
        closes_road: d.closes_road,
    }
}
