//! Listing of active disruptions grouped by incident type.

use rh_core::{DisruptionId, GeoPoint, Timestamp};
use rh_graph::RoadGraph;

use crate::disruption::{Disruption, IncidentType, Severity};
use crate::overlay::DisruptionOverlay;

/// One disruption as shown in a listing.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DisruptionView {
    pub id:            DisruptionId,
    pub incident_type: IncidentType,
    pub severity:      Severity,
    pub ratio:         f64,
    pub jam_factor:    f64,
    pub closes_road:   bool,
    pub road_name:     String,
    pub description:   String,
    /// Midpoint of the first affected edge.
    pub location:      GeoPoint,
    pub edge_count:    usize,
    pub reported_at:   Timestamp,
    pub expires_at:    Option<Timestamp>,
}

/// Disruptions of one incident type.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TypeGroup {
    pub incident_type: IncidentType,
    pub label:         &'static str,
    pub count:         usize,
    pub disruptions:   Vec<DisruptionView>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SeverityCounts {
    pub heavy:  usize,
    pub medium: usize,
    pub light:  usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DisruptionSummary {
    pub total:       usize,
    pub closures:    usize,
    pub by_severity: SeverityCounts,
    /// Non-empty groups in [`IncidentType::ALL`] order.
    pub groups:      Vec<TypeGroup>,
}

impl DisruptionSummary {
    pub fn count_of(&self, incident_type: IncidentType) -> usize {
        self.groups
            .iter()
            .find(|g| g.incident_type == incident_type)
            .map_or(0, |g| g.count)
    }
}

/// Summarise the disruptions active at `now`.
pub fn summarize(overlay: &DisruptionOverlay, graph: &RoadGraph, now: Timestamp) -> DisruptionSummary {
    let mut summary = DisruptionSummary::default();
    let mut groups: Vec<TypeGroup> = IncidentType::ALL
        .iter()
        .map(|&t| TypeGroup { incident_type: t, label: t.label(), count: 0, disruptions: Vec::new() })
        .collect();

    for d in overlay.iter().filter(|d| d.is_active(now)) {
        summary.total += 1;
        if d.closes_road {
            summary.closures += 1;
        }
        match d.severity {
            Severity::Heavy  => summary.by_severity.heavy += 1,
            Severity::Medium => summary.by_severity.medium += 1,
            Severity::Light  => summary.by_severity.light += 1,
        }
        if let Some(g) = groups.iter_mut().find(|g| g.incident_type == d.incident_type) {
            g.count += 1;
            g.disruptions.push(view(d, graph));
        }
    }

    groups.retain(|g| g.count > 0);
    summary.groups = groups;
    summary
}

fn view(d: &Disruption, graph: &RoadGraph) -> DisruptionView {
    let location = d
        .edges
        .first()
        .map(|&e| {
            let (a, b) = graph.endpoints(e);
            graph.node_pos[a.index()].midpoint(graph.node_pos[b.index()])
        })
        .unwrap_or(GeoPoint::new(0.0, 0.0));
    DisruptionView {
        id: d.id,
        incident_type: d.incident_type,
        severity: d.severity,
        ratio: d.ratio,
        jam_factor: d.jam_factor,
        closes_road: d.closes_road,
        road_name: d.road_name.clone(),
        description: d.description.clone(),
        location,
        edge_count: d.edges.len(),
        reported_at: d.reported_at,
        expires_at: d.expires_at,
    }
}
