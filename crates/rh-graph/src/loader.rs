//! Node/edge record loading.
//!
//! # CSV format
//!
//! Two files: one row per node, one row per road segment.
//!
//! ```csv
//! node_id,lat,lng
//! 1001,14.6507,121.0494
//! 1002,14.6521,121.0510
//! ```
//!
//! ```csv
//! source,target,length_m,travel_time_s,road_name,oneway,highway
//! 1001,1002,230.5,20.7,Commonwealth Avenue,no,primary
//! 1002,1003,110.0,,Tandang Sora Avenue,yes,
//! ```
//!
//! | Column          | Meaning                                                   |
//! |-----------------|-----------------------------------------------------------|
//! | `travel_time_s` | Optional.  Empty → derived from length and road speed.    |
//! | `road_name`     | Optional.  Empty → unnamed road.                          |
//! | `oneway`        | `yes`/`true`/`1` → one directed edge; anything else → two.|
//! | `highway`       | Optional road class used to pick a speed (see below).     |
//!
//! A derived travel time never rounds below one second, so every edge keeps
//! a strictly positive weight.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use rh_core::{GeoPoint, NodeId};

use crate::error::{DataError, GraphResult};
use crate::network::{EdgeSpec, RoadGraph, RoadGraphBuilder};
use crate::weight::Weight;

// ── Records ───────────────────────────────────────────────────────────────────

/// One row of `nodes.csv`.
#[derive(Clone, Debug, Deserialize)]
pub struct NodeRecord {
    pub node_id: u64,
    pub lat:     f64,
    pub lng:     f64,
}

/// One row of `edges.csv`.
#[derive(Clone, Debug, Deserialize)]
pub struct EdgeRecord {
    pub source:        u64,
    pub target:        u64,
    pub length_m:      f64,
    #[serde(default)]
    pub travel_time_s: Option<f64>,
    #[serde(default)]
    pub road_name:     Option<String>,
    #[serde(default)]
    pub oneway:        Option<String>,
    #[serde(default)]
    pub highway:       Option<String>,
}

impl EdgeRecord {
    /// A two-way record with an explicit travel time.
    pub fn new(source: u64, target: u64, length_m: f64, travel_time_s: f64, road_name: &str) -> Self {
        Self {
            source,
            target,
            length_m,
            travel_time_s: Some(travel_time_s),
            road_name: Some(road_name.to_owned()),
            oneway: None,
            highway: None,
        }
    }

    /// Builder-style setter for the one-way flag.
    pub fn one_way(mut self) -> Self {
        self.oneway = Some("yes".to_owned());
        self
    }

    pub fn is_oneway(&self) -> bool {
        self.oneway
            .as_deref()
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "yes" | "true" | "1"))
            .unwrap_or(false)
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Loader settings.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Speed assumed for edges with no travel time and no known road class.
    pub default_speed_kph: f64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { default_speed_kph: 30.0 }
    }
}

/// Assumed speed (km/h) for a road class.  Unknown classes use the default.
pub fn road_class_speed_kph(highway: &str) -> Option<f64> {
    match highway.trim().to_ascii_lowercase().as_str() {
        "motorway"     | "motorway_link"  => Some(80.0),
        "trunk"        | "trunk_link"     => Some(70.0),
        "primary"      | "primary_link"   => Some(60.0),
        "secondary"    | "secondary_link" => Some(40.0),
        "tertiary"     | "tertiary_link"  => Some(30.0),
        "residential"  | "living_street"  => Some(20.0),
        "unclassified"                    => Some(25.0),
        "service"                         => Some(15.0),
        _                                 => None,
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Build a [`RoadGraph`] from node and edge records.
///
/// # Errors
///
/// [`DataError`] when an edge references an unknown node, has a non-positive
/// length or a zero travel time, or when a node id is duplicated.  Edge
/// numbers in the error are record positions.
pub fn load(nodes: &[NodeRecord], edges: &[EdgeRecord], opts: &LoadOptions) -> GraphResult<RoadGraph> {
    let mut builder = RoadGraphBuilder::with_capacity(nodes.len(), edges.len() * 2);
    let mut ids = std::collections::HashMap::with_capacity(nodes.len());

    for n in nodes {
        if !n.lat.is_finite() || !n.lng.is_finite() {
            return Err(DataError::InvalidCoordinate { id: n.node_id, lat: n.lat, lng: n.lng }.into());
        }
        let id = builder.add_node(n.node_id, GeoPoint::new(n.lat, n.lng));
        if ids.insert(n.node_id, id).is_some() {
            return Err(DataError::DuplicateNode(n.node_id).into());
        }
    }

    for (i, e) in edges.iter().enumerate() {
        let from = lookup(&ids, i, e.source)?;
        let to = lookup(&ids, i, e.target)?;
        if !(e.length_m > 0.0) || !e.length_m.is_finite() {
            return Err(DataError::NonPositiveLength { edge: i, length_m: e.length_m }.into());
        }
        let travel_ms = edge_travel_ms(e, opts);
        if travel_ms == 0 {
            return Err(DataError::ZeroTravelTime { edge: i }.into());
        }

        let spec = EdgeSpec::new(e.length_m, travel_ms, e.road_name.as_deref().unwrap_or("").trim());
        if e.is_oneway() {
            builder.add_directed_edge(from, to, spec);
        } else {
            builder.add_road(from, to, spec);
        }
    }

    let graph = builder.build()?;
    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        records = edges.len(),
        "graph loaded"
    );
    Ok(graph)
}

/// Load a graph from `nodes.csv` and `edges.csv` files.
pub fn load_csv(nodes_path: &Path, edges_path: &Path, opts: &LoadOptions) -> GraphResult<RoadGraph> {
    let nodes = std::fs::File::open(nodes_path)?;
    let edges = std::fs::File::open(edges_path)?;
    load_readers(nodes, edges, opts)
}

/// Like [`load_csv`] but accepts any `Read` sources.
///
/// Useful for testing (pass a `std::io::Cursor`).
pub fn load_readers<N: Read, E: Read>(nodes: N, edges: E, opts: &LoadOptions) -> GraphResult<RoadGraph> {
    let node_rows: Vec<NodeRecord> = csv::Reader::from_reader(nodes)
        .deserialize()
        .collect::<Result<_, _>>()?;
    let edge_rows: Vec<EdgeRecord> = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(edges)
        .deserialize()
        .collect::<Result<_, _>>()?;
    load(&node_rows, &edge_rows, opts)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn lookup(ids: &std::collections::HashMap<u64, NodeId>, edge: usize, ext: u64) -> GraphResult<NodeId> {
    ids.get(&ext)
        .copied()
        .ok_or_else(|| DataError::UnknownNode { edge, node: ext }.into())
}

/// Travel time in milliseconds.  An explicit time is used as-is; otherwise
/// it is derived from length and speed and clamped to at least one second.
fn edge_travel_ms(e: &EdgeRecord, opts: &LoadOptions) -> Weight {
    match e.travel_time_s {
        Some(secs) if secs.is_finite() && secs >= 0.0 => (secs * 1_000.0).round() as Weight,
        Some(_) => 0,
        None => {
            let kph = e
                .highway
                .as_deref()
                .and_then(road_class_speed_kph)
                .unwrap_or(opts.default_speed_kph);
            let secs = (e.length_m / 1_000.0) / (kph / 3_600.0);
            (secs.round().max(1.0) * 1_000.0) as Weight
        }
    }
}
