//! Road graph representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format in both directions.
//! Edges are sorted by source node, so the outgoing edges of `NodeId n` are
//! the contiguous `EdgeId` range:
//!
//! ```text
//! out_start[n] .. out_start[n+1]
//! ```
//!
//! Incoming edges are indexed through a second CSR array of `EdgeId`s:
//!
//! ```text
//! in_edges[ in_start[n] .. in_start[n+1] ]
//! ```
//!
//! Backward searches (distance *to* a hub) walk the incoming index; forward
//! searches walk the outgoing range.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(lat, lng)` to the nearest `NodeId`.  Used
//! to snap route origins, destinations, and disruption reports to the graph.

use std::collections::HashMap;

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use rh_core::{EdgeId, GeoPoint, NodeId};

use crate::error::{DataError, GraphResult};
use crate::weight::{EdgeSlowdown, Weight};

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the R-tree spatial index: a 2-D `[lat, lng]` point with
/// the associated `NodeId`.
#[derive(Clone)]
struct NodeEntry {
    point: [f64; 2], // [lat, lng]
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared Euclidean distance in lat/lng space.  Sufficient for
    /// nearest-node queries within a city.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.point[0] - point[0];
        let dlng = self.point[1] - point[1];
        dlat * dlat + dlng * dlng
    }
}

// ── Edge metadata ─────────────────────────────────────────────────────────────

/// Whether a directed edge belongs to a one-way or a two-way road.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Directionality {
    OneWay,
    TwoWay,
}

/// Search direction over the adjacency index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Follow outgoing edges (`u → v`).
    Forward,
    /// Follow incoming edges in reverse (`v ← u`).
    Backward,
}

impl Direction {
    pub fn reverse(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

// ── RoadGraph ─────────────────────────────────────────────────────────────────

/// Directed road graph in CSR format plus a spatial index for node snapping.
///
/// All array fields are `pub` for direct indexed access on hot paths.  Do not
/// construct directly; use [`RoadGraphBuilder`] or [`crate::load`].
pub struct RoadGraph {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Geographic position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    /// External identifier of each node (e.g. an OSM id).  Indexed by `NodeId`.
    pub node_ext_id: Vec<u64>,

    // ── CSR adjacency ─────────────────────────────────────────────────────
    /// Outgoing edges of node `n` are at EdgeIds `out_start[n] .. out_start[n+1]`.
    /// Length = `node_count + 1`.
    pub out_start: Vec<u32>,

    /// Row pointer into `in_edges`.  Length = `node_count + 1`.
    pub in_start: Vec<u32>,

    /// Incoming `EdgeId`s grouped by target node.
    pub in_edges: Vec<EdgeId>,

    // ── Edge data (indexed by EdgeId = position in sorted order) ──────────
    pub edge_from: Vec<NodeId>,
    pub edge_to: Vec<NodeId>,

    /// Physical length of each edge in metres.
    pub edge_length_m: Vec<f64>,

    /// Base (undisrupted) travel time in milliseconds.
    pub edge_travel_ms: Vec<Weight>,

    /// Index into `road_names`.
    pub edge_road: Vec<u32>,

    pub edge_direction: Vec<Directionality>,

    /// Interned road names.  Unnamed roads use the empty string.
    pub road_names: Vec<String>,

    // ── Lookup indexes ────────────────────────────────────────────────────
    ext_to_node: HashMap<u64, NodeId>,
    spatial_idx: RTree<NodeEntry>,
}

impl RoadGraph {
    /// Construct an empty graph with no nodes or edges.
    pub fn empty() -> Self {
        // An empty builder can never fail validation.
        match RoadGraphBuilder::new().build() {
            Ok(g) => g,
            Err(_) => unreachable!("empty graph is always valid"),
        }
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.out_start[node.index()] as usize;
        let end   = self.out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    /// Iterator over the `EdgeId`s of all incoming edges to `node`.
    #[inline]
    pub fn in_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.in_start[node.index()] as usize;
        let end   = self.in_start[node.index() + 1] as usize;
        self.in_edges[start..end].iter().copied()
    }

    /// `(edge, neighbour)` pairs in the given direction.  For `Backward`, the
    /// neighbour is the edge's source.
    pub fn neighbors(
        &self,
        node: NodeId,
        direction: Direction,
    ) -> Box<dyn Iterator<Item = (EdgeId, NodeId)> + '_> {
        match direction {
            Direction::Forward => Box::new(
                self.out_edges(node).map(move |e| (e, self.edge_to[e.index()])),
            ),
            Direction::Backward => Box::new(
                self.in_edges(node).map(move |e| (e, self.edge_from[e.index()])),
            ),
        }
    }

    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        (self.out_start[node.index() + 1] - self.out_start[node.index()]) as usize
    }

    #[inline]
    pub fn in_degree(&self, node: NodeId) -> usize {
        (self.in_start[node.index() + 1] - self.in_start[node.index()]) as usize
    }

    /// All directed edges connecting `a` and `b`, in either direction.
    pub fn edges_between(&self, a: NodeId, b: NodeId) -> Vec<EdgeId> {
        let mut found: Vec<EdgeId> = self
            .out_edges(a)
            .filter(|e| self.edge_to[e.index()] == b)
            .chain(self.out_edges(b).filter(|e| self.edge_to[e.index()] == a))
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Endpoints of `edge` as `(from, to)`.
    #[inline]
    pub fn endpoints(&self, edge: EdgeId) -> (NodeId, NodeId) {
        (self.edge_from[edge.index()], self.edge_to[edge.index()])
    }

    #[inline]
    pub fn road_name(&self, edge: EdgeId) -> &str {
        &self.road_names[self.edge_road[edge.index()] as usize]
    }

    /// Look up a node by its external identifier.
    pub fn node_by_external(&self, ext_id: u64) -> Option<NodeId> {
        self.ext_to_node.get(&ext_id).copied()
    }

    // ── Weights ───────────────────────────────────────────────────────────

    /// Effective travel time of `edge` under `overlay`: base time divided by
    /// the slowdown ratio when disrupted, infinite when closed.
    #[inline]
    pub fn effective_weight<S: EdgeSlowdown + ?Sized>(&self, edge: EdgeId, overlay: &S) -> Weight {
        let base = self.edge_travel_ms[edge.index()];
        match overlay.slowdown(edge) {
            Some(s) => s.apply(base),
            None => base,
        }
    }

    /// Materialise the effective weight of every edge.
    pub fn weights<S: EdgeSlowdown + ?Sized>(&self, overlay: &S) -> Vec<Weight> {
        (0..self.edge_count())
            .map(|i| self.effective_weight(EdgeId(i as u32), overlay))
            .collect()
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Return the nearest node to `pos` and its haversine distance in metres.
    ///
    /// Equidistant candidates resolve to the lowest dense [`NodeId`], so
    /// snapping is deterministic.  Returns `None` only if the graph has no nodes.
    pub fn nearest_node(&self, pos: GeoPoint) -> Option<(NodeId, f64)> {
        let query = [pos.lat, pos.lng];
        let mut iter = self.spatial_idx.nearest_neighbor_iter_with_distance_2(&query);
        let (first, best_d2) = iter.next()?;
        let mut best = first.id;
        for (entry, d2) in iter {
            if d2 > best_d2 {
                break;
            }
            if entry.id < best {
                best = entry.id;
            }
        }
        Some((best, pos.distance_m(self.node_pos[best.index()])))
    }
}

// ── RoadGraphBuilder ──────────────────────────────────────────────────────────

/// Attributes of one directed edge passed to the builder.
#[derive(Clone, Debug)]
pub struct EdgeSpec {
    pub length_m:  f64,
    pub travel_ms: Weight,
    pub road_name: String,
}

impl EdgeSpec {
    pub fn new(length_m: f64, travel_ms: Weight, road_name: impl Into<String>) -> Self {
        Self { length_m, travel_ms, road_name: road_name.into() }
    }
}

/// Construct a [`RoadGraph`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use rh_core::GeoPoint;
/// use rh_graph::RoadGraphBuilder;
/// use rh_graph::network::EdgeSpec;
///
/// let mut b = RoadGraphBuilder::new();
/// let a = b.add_node(1, GeoPoint::new(14.65, 121.03));
/// let c = b.add_node(2, GeoPoint::new(14.66, 121.04));
/// b.add_road(a, c, EdgeSpec::new(1_200.0, 90_000, "Commonwealth Avenue"));
/// let g = b.build().unwrap();
/// assert_eq!(g.node_count(), 2);
/// assert_eq!(g.edge_count(), 2); // two-way
/// ```
pub struct RoadGraphBuilder {
    nodes:     Vec<(u64, GeoPoint)>,
    raw_edges: Vec<RawEdge>,
}

struct RawEdge {
    from:      NodeId,
    to:        NodeId,
    spec:      EdgeSpec,
    direction: Directionality,
}

impl RoadGraphBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), raw_edges: Vec::new() }
    }

    /// Pre-allocate for the expected number of nodes and edges.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes:     Vec::with_capacity(nodes),
            raw_edges: Vec::with_capacity(edges),
        }
    }

    /// Add a node and return its dense `NodeId` (sequential from 0).
    pub fn add_node(&mut self, ext_id: u64, pos: GeoPoint) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push((ext_id, pos));
        id
    }

    /// Add a **directed** one-way edge from `from` to `to`.
    pub fn add_directed_edge(&mut self, from: NodeId, to: NodeId, spec: EdgeSpec) {
        self.raw_edges.push(RawEdge { from, to, spec, direction: Directionality::OneWay });
    }

    /// Add a two-way road segment as two directed edges.
    pub fn add_road(&mut self, a: NodeId, b: NodeId, spec: EdgeSpec) {
        self.raw_edges.push(RawEdge {
            from: a,
            to: b,
            spec: spec.clone(),
            direction: Directionality::TwoWay,
        });
        self.raw_edges.push(RawEdge { from: b, to: a, spec, direction: Directionality::TwoWay });
    }

    pub fn node_pos(&self, id: NodeId) -> GeoPoint {
        self.nodes[id.index()].1
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Validate and consume the builder, producing a [`RoadGraph`].
    ///
    /// Edge numbers in errors refer to insertion order.
    ///
    /// Time complexity: O(E log E) for edge sort + O(N log N) for R-tree bulk
    /// load.
    pub fn build(self) -> GraphResult<RoadGraph> {
        let node_count = self.nodes.len();

        // ── Validate ──────────────────────────────────────────────────────
        let mut ext_to_node = HashMap::with_capacity(node_count);
        for (i, &(ext, pos)) in self.nodes.iter().enumerate() {
            if !pos.lat.is_finite() || !pos.lng.is_finite() {
                return Err(DataError::InvalidCoordinate { id: ext, lat: pos.lat, lng: pos.lng }.into());
            }
            if ext_to_node.insert(ext, NodeId(i as u32)).is_some() {
                return Err(DataError::DuplicateNode(ext).into());
            }
        }
        for (i, e) in self.raw_edges.iter().enumerate() {
            for n in [e.from, e.to] {
                if n.index() >= node_count {
                    return Err(DataError::UnknownNode { edge: i, node: n.0 as u64 }.into());
                }
            }
            if !(e.spec.length_m > 0.0) || !e.spec.length_m.is_finite() {
                return Err(DataError::NonPositiveLength { edge: i, length_m: e.spec.length_m }.into());
            }
            if e.spec.travel_ms == 0 {
                return Err(DataError::ZeroTravelTime { edge: i }.into());
            }
        }

        // ── Sort edges by source node for CSR construction ────────────────
        let mut raw = self.raw_edges;
        raw.sort_by_key(|e| e.from.0);
        let edge_count = raw.len();

        // Intern road names.
        let mut road_names: Vec<String> = Vec::new();
        let mut name_idx: HashMap<String, u32> = HashMap::new();
        let mut edge_road = Vec::with_capacity(edge_count);
        for e in &raw {
            let idx = *name_idx.entry(e.spec.road_name.clone()).or_insert_with(|| {
                road_names.push(e.spec.road_name.clone());
                (road_names.len() - 1) as u32
            });
            edge_road.push(idx);
        }

        let edge_from:      Vec<NodeId>         = raw.iter().map(|e| e.from).collect();
        let edge_to:        Vec<NodeId>         = raw.iter().map(|e| e.to).collect();
        let edge_length_m:  Vec<f64>            = raw.iter().map(|e| e.spec.length_m).collect();
        let edge_travel_ms: Vec<Weight>         = raw.iter().map(|e| e.spec.travel_ms).collect();
        let edge_direction: Vec<Directionality> = raw.iter().map(|e| e.direction).collect();

        // ── Outgoing CSR row pointer ──────────────────────────────────────
        let mut out_start = vec![0u32; node_count + 1];
        for e in &raw {
            out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            out_start[i] += out_start[i - 1];
        }
        debug_assert_eq!(out_start[node_count] as usize, edge_count);

        // ── Incoming CSR (counting sort by target) ────────────────────────
        let mut in_start = vec![0u32; node_count + 1];
        for to in &edge_to {
            in_start[to.index() + 1] += 1;
        }
        for i in 1..=node_count {
            in_start[i] += in_start[i - 1];
        }
        let mut cursor: Vec<u32> = in_start[..node_count].to_vec();
        let mut in_edges = vec![EdgeId::INVALID; edge_count];
        for (i, to) in edge_to.iter().enumerate() {
            let slot = &mut cursor[to.index()];
            in_edges[*slot as usize] = EdgeId(i as u32);
            *slot += 1;
        }

        // Bulk-load R-tree for O(N log N) construction (faster than N inserts).
        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &(_, pos))| NodeEntry { point: [pos.lat, pos.lng], id: NodeId(i as u32) })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        tracing::debug!(nodes = node_count, edges = edge_count, roads = road_names.len(), "road graph built");

        Ok(RoadGraph {
            node_ext_id: self.nodes.iter().map(|&(ext, _)| ext).collect(),
            node_pos: self.nodes.into_iter().map(|(_, pos)| pos).collect(),
            out_start,
            in_start,
            in_edges,
            edge_from,
            edge_to,
            edge_length_m,
            edge_travel_ms,
            edge_road,
            edge_direction,
            road_names,
            ext_to_node,
            spatial_idx,
        })
    }
}

impl Default for RoadGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
