//! Route results: road segments, turn-by-turn text, and timing metrics.

use serde::Serialize;

use rh_core::{GeoPoint, NodeId};
use rh_graph::RoadGraph;
use rh_label::{LabelPath, LabelStats, MaintenanceState, RepairStrategy};

/// Display name for edges without a road name.  Never merged.
pub const UNKNOWN_ROAD: &str = "Unknown Road";

// ── Snapping ──────────────────────────────────────────────────────────────────

/// Where a requested coordinate landed on the graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SnapInfo {
    pub requested:   GeoPoint,
    pub node:        NodeId,
    /// External id from the input data.
    pub external_id: u64,
    pub position:    GeoPoint,
    /// Haversine distance from the requested coordinate to the node.
    pub distance_m:  f64,
}

// ── Segments ──────────────────────────────────────────────────────────────────

/// A run of consecutive edges on the same road.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoadSegment {
    pub road_name:   String,
    pub length_m:    f64,
    /// External ids of the first and last node of the run.
    pub from_node:   u64,
    pub to_node:     u64,
    pub instruction: String,
}

/// Merge a path's edges into road segments and label each with its
/// instruction (`Start on`, `Turn onto`, `Continue on … to destination`).
pub fn road_segments(graph: &RoadGraph, path: &LabelPath) -> Vec<RoadSegment> {
    let mut segments: Vec<RoadSegment> = Vec::new();
    for &e in &path.edges {
        let name = match graph.road_name(e).trim() {
            "" => UNKNOWN_ROAD,
            n => n,
        };
        let (from, to) = graph.endpoints(e);
        let length = graph.edge_length_m[e.index()];
        match segments.last_mut() {
            Some(last) if last.road_name == name && name != UNKNOWN_ROAD => {
                last.length_m += length;
                last.to_node = graph.node_ext_id[to.index()];
            }
            _ => segments.push(RoadSegment {
                road_name:   name.to_owned(),
                length_m:    length,
                from_node:   graph.node_ext_id[from.index()],
                to_node:     graph.node_ext_id[to.index()],
                instruction: String::new(),
            }),
        }
    }

    let last = segments.len().saturating_sub(1);
    for (i, seg) in segments.iter_mut().enumerate() {
        seg.instruction = if i == 0 {
            format!("Start on {}", seg.road_name)
        } else if i == last {
            format!("Continue on {} to destination", seg.road_name)
        } else {
            format!("Turn onto {}", seg.road_name)
        };
    }
    segments
}

/// Numbered directions, e.g. `"2. Turn onto Katipunan Avenue (850m)"`.
pub fn turn_by_turn(segments: &[RoadSegment]) -> Vec<String> {
    segments
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if s.length_m > 0.0 {
                format!("{}. {} ({:.0}m)", i + 1, s.instruction, s.length_m)
            } else {
                format!("{}. {}", i + 1, s.instruction)
            }
        })
        .collect()
}

// ── Metrics ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct TimingMetrics {
    /// Wall time of the label query alone, in milliseconds.
    pub query_response_time: f64,
    /// Wall time of the most recent full label build, in milliseconds.
    pub labeling_time:       f64,
    /// Approximate index size in bytes.
    pub labeling_size:       usize,
    pub label_entries:       usize,
}

impl TimingMetrics {
    pub fn new(query_ms: f64, stats: LabelStats) -> Self {
        Self {
            query_response_time: query_ms,
            labeling_time:       stats.build_time.as_secs_f64() * 1e3,
            labeling_size:       stats.bytes,
            label_entries:       stats.entries,
        }
    }
}

/// How disruptions changed the dynamic engine's answer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisruptionImpact {
    /// Length of the undisrupted shortest route, in metres.
    pub base_distance:             f64,
    /// Length of the route under current disruptions, in metres.
    pub disrupted_distance:        f64,
    pub distance_increase:         f64,
    pub distance_increase_percent: f64,
    /// Active disruptions in the overlay when the query ran.
    pub disruptions_considered:    usize,
    pub maintenance_state:         MaintenanceState,
    /// Strategy chosen for the request's own disruptions, if it carried any.
    pub repair_strategy:           Option<RepairStrategy>,
    pub route_comparison:          String,
}

impl DisruptionImpact {
    pub fn new(base_m: f64, disrupted_m: f64, considered: usize, state: MaintenanceState) -> Self {
        let increase = disrupted_m - base_m;
        let percent = if base_m > 0.0 { increase / base_m * 100.0 } else { 0.0 };
        let route_comparison = if increase.abs() < 1e-6 {
            "Same route used (no impact from disruptions)".to_owned()
        } else if increase > 0.0 {
            format!("Alternative route found (+{percent:.1}% longer)")
        } else {
            "Shorter route found (optimized)".to_owned()
        };
        Self {
            base_distance: base_m,
            disrupted_distance: disrupted_m,
            distance_increase: increase,
            distance_increase_percent: percent,
            disruptions_considered: considered,
            maintenance_state: state,
            repair_strategy: None,
            route_comparison,
        }
    }
}

// ── RouteResult ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteResult {
    /// `"DHL"` or `"HC2L"`.
    pub engine:           String,
    pub origin:           SnapInfo,
    pub destination:      SnapInfo,
    /// External node ids, origin to destination.
    pub nodes:            Vec<u64>,
    pub coordinates:      Vec<GeoPoint>,
    pub segments:         Vec<RoadSegment>,
    pub instructions:     Vec<String>,
    pub total_distance_m: f64,
    /// Travel time under the weights the engine answered with.
    pub total_time_s:     f64,
    /// Answered by the Dijkstra fallback instead of the labels.
    pub fallback:         bool,
    pub timing_metrics:   TimingMetrics,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub impact:           Option<DisruptionImpact>,
}

impl RouteResult {
    pub fn assemble(
        graph: &RoadGraph,
        engine: &str,
        origin: SnapInfo,
        destination: SnapInfo,
        path: &LabelPath,
        timing_metrics: TimingMetrics,
    ) -> Self {
        let segments = road_segments(graph, path);
        Self {
            engine: engine.to_owned(),
            origin,
            destination,
            nodes: path.nodes.iter().map(|n| graph.node_ext_id[n.index()]).collect(),
            coordinates: path.nodes.iter().map(|n| graph.node_pos[n.index()]).collect(),
            instructions: turn_by_turn(&segments),
            segments,
            total_distance_m: path_length_m(graph, path),
            total_time_s: path.distance as f64 / 1e3,
            fallback: path.fallback,
            timing_metrics,
            impact: None,
        }
    }

    /// Distinct road names in travel order.
    pub fn road_names(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for s in &self.segments {
            if !out.contains(&s.road_name) {
                out.push(s.road_name.clone());
            }
        }
        out
    }
}

pub fn path_length_m(graph: &RoadGraph, path: &LabelPath) -> f64 {
    path.edges.iter().map(|e| graph.edge_length_m[e.index()]).sum()
}
