//! Traffic-scenario CSV import.
//!
//! # CSV format
//!
//! One row per measured road segment:
//!
//! ```csv
//! source_lat,source_lon,target_lat,target_lon,source,target,road_name,speed_kph,freeFlow_kph,jamFactor,isClosed,segmentLength
//! 14.6507,121.0494,14.6521,121.0510,1001,1002,Commonwealth Avenue,12.0,48.0,7.5,False,230.5
//! ```
//!
//! The measured ratio is `speed_kph / freeFlow_kph`.  Rows that are neither
//! closed nor slower than free flow (`ratio >= 1`) are skipped.  Endpoints
//! are matched by external node id first and by nearest node second.
//!
//! Incident type is classified from the measurements alone; rows carry no
//! time-of-day or venue information, so those inputs take fixed defaults
//! (see [`RowContext`]).

use std::io::Read;

use serde::Deserialize;

use rh_core::{GeoPoint, NodeId, Timestamp};
use rh_graph::RoadGraph;

use crate::disruption::{DisruptionTarget, IncidentType, NewDisruption, Severity};
use crate::error::OverlayResult;

// ── CSV record ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ScenarioRecord {
    source_lat:    f64,
    source_lon:    f64,
    target_lat:    f64,
    target_lon:    f64,
    source:        u64,
    target:        u64,
    #[serde(default)]
    road_name:     String,
    speed_kph:     f64,
    #[serde(rename = "freeFlow_kph")]
    free_flow_kph: f64,
    #[serde(rename = "jamFactor")]
    jam_factor:    f64,
    #[serde(rename = "isClosed")]
    is_closed:     String,
    #[serde(rename = "segmentLength")]
    segment_length: f64,
}

/// Inputs to incident classification that scenario rows do not carry.
#[derive(Clone, Debug)]
pub struct RowContext {
    pub hour_of_day:  u8,
    pub location_tag: String,
    pub duration_min: u32,
    /// 1 when congestion is building, 0 when steady.
    pub jam_tendency: i32,
}

impl Default for RowContext {
    fn default() -> Self {
        Self { hour_of_day: 12, location_tag: "road".to_owned(), duration_min: 30, jam_tendency: 1 }
    }
}

/// Measurements of one scenario row used for classification.
#[derive(Copy, Clone, Debug)]
pub struct RowMeasure {
    pub speed_kph:      f64,
    pub ratio:          f64,
    pub jam_factor:     f64,
    pub closed:         bool,
    pub segment_length: f64,
}

/// Rule-based incident classification.  Rules are tried in order.
pub fn classify_incident(m: &RowMeasure, ctx: &RowContext) -> IncidentType {
    let venue = ctx.location_tag.as_str();
    let hour = ctx.hour_of_day;
    if m.closed || m.jam_factor >= 10.0 {
        IncidentType::RoadClosure
    } else if m.speed_kph < 2.0 && m.jam_factor > 7.0 {
        IncidentType::Accident
    } else if m.ratio <= 0.5 && ctx.duration_min >= 30 && m.jam_factor < 7.0 {
        IncidentType::Construction
    } else if m.jam_factor > 7.0 && m.speed_kph < 5.0 {
        IncidentType::Congestion
    } else if m.speed_kph <= 1.0 && m.jam_factor < 4.0 && m.segment_length < 100.0 {
        IncidentType::DisabledVehicle
    } else if venue == "terminal" && (6..=9).contains(&hour) {
        IncidentType::MassTransitEvent
    } else if venue == "event_venue" && hour >= 18 {
        IncidentType::PlannedEvent
    } else if m.ratio < 0.4 && ctx.jam_tendency == 1 {
        IncidentType::RoadHazard
    } else if (10.0..=15.0).contains(&m.speed_kph) && ctx.jam_tendency == 1 {
        IncidentType::LaneRestriction
    } else if m.speed_kph < 10.0 && ctx.duration_min > 20 {
        IncidentType::Weather
    } else {
        IncidentType::Other
    }
}

// ── Import ────────────────────────────────────────────────────────────────────

/// Disruptions parsed from a scenario file, plus row accounting.
#[derive(Debug, Default)]
pub struct ScenarioImport {
    pub disruptions: Vec<NewDisruption>,
    /// Rows at or above free-flow speed and not closed.
    pub skipped:     usize,
    /// Rows whose endpoints map to no road in the graph.
    pub unresolved:  usize,
}

/// Parse a scenario CSV against `graph`.
///
/// Disruptions are stamped with `now` and expire after `ttl_secs` when given.
pub fn read_scenario<R: Read>(
    reader: R,
    graph: &RoadGraph,
    now: Timestamp,
    ttl_secs: Option<u64>,
) -> OverlayResult<ScenarioImport> {
    let ctx = RowContext::default();
    let mut out = ScenarioImport::default();
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    for row in rdr.deserialize::<ScenarioRecord>() {
        let row = row?;
        let closed = matches!(row.is_closed.as_str(), "True" | "true" | "1");
        let free_flow = if row.free_flow_kph > 0.0 { row.free_flow_kph } else { 1.0 };
        let ratio = (row.speed_kph / free_flow).max(1e-9);
        if !closed && ratio >= 1.0 {
            out.skipped += 1;
            continue;
        }

        let (Some(a), Some(b)) = (
            endpoint(graph, row.source, GeoPoint::new(row.source_lat, row.source_lon)),
            endpoint(graph, row.target, GeoPoint::new(row.target_lat, row.target_lon)),
        ) else {
            out.unresolved += 1;
            continue;
        };
        if a == b || graph.edges_between(a, b).is_empty() {
            out.unresolved += 1;
            continue;
        }

        let measure = RowMeasure {
            speed_kph: row.speed_kph,
            ratio,
            jam_factor: row.jam_factor.clamp(0.0, 10.0),
            closed,
            segment_length: row.segment_length,
        };
        let incident = classify_incident(&measure, &ctx);
        let description = format!(
            "{} at {:.0} of {:.0} km/h, jam {:.1}",
            incident.label(),
            row.speed_kph,
            row.free_flow_kph,
            measure.jam_factor
        );
        out.disruptions.push(
            NewDisruption::new(DisruptionTarget::NodePair(a, b), incident, Severity::from_ratio(ratio))
                .closed(closed)
                .with_ratio(ratio.min(1.0))
                .with_jam_factor(measure.jam_factor)
                .reported(now, ttl_secs)
                .named(row.road_name, description),
        );
    }

    tracing::info!(
        disruptions = out.disruptions.len(),
        skipped = out.skipped,
        unresolved = out.unresolved,
        "scenario parsed"
    );
    Ok(out)
}

fn endpoint(graph: &RoadGraph, ext: u64, pos: GeoPoint) -> Option<NodeId> {
    graph
        .node_by_external(ext)
        .or_else(|| graph.nearest_node(pos).map(|(n, _)| n))
}
