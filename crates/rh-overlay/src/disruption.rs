//! Disruption records and their classification.

use std::cmp::Ordering;
use std::fmt;

use rh_core::{DisruptionId, EdgeId, NodeId, Timestamp};
use rh_graph::{RoadGraph, Slowdown};

use crate::error::{OverlayError, OverlayResult};

// ── IncidentType ──────────────────────────────────────────────────────────────

/// Kind of reported incident.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IncidentType {
    RoadClosure,
    Accident,
    Construction,
    Congestion,
    DisabledVehicle,
    MassTransitEvent,
    PlannedEvent,
    RoadHazard,
    LaneRestriction,
    Weather,
    Other,
}

impl IncidentType {
    pub const ALL: [IncidentType; 11] = [
        IncidentType::RoadClosure,
        IncidentType::Accident,
        IncidentType::Construction,
        IncidentType::Congestion,
        IncidentType::DisabledVehicle,
        IncidentType::MassTransitEvent,
        IncidentType::PlannedEvent,
        IncidentType::RoadHazard,
        IncidentType::LaneRestriction,
        IncidentType::Weather,
        IncidentType::Other,
    ];

    /// Human-readable label used in listings.
    pub fn label(self) -> &'static str {
        match self {
            IncidentType::RoadClosure      => "Road Closure",
            IncidentType::Accident         => "Accident",
            IncidentType::Construction     => "Construction",
            IncidentType::Congestion       => "Congestion",
            IncidentType::DisabledVehicle  => "Disabled Vehicle",
            IncidentType::MassTransitEvent => "Mass Transit Event",
            IncidentType::PlannedEvent     => "Planned Event",
            IncidentType::RoadHazard       => "Road Hazard",
            IncidentType::LaneRestriction  => "Lane Restriction",
            IncidentType::Weather          => "Weather",
            IncidentType::Other            => "Other",
        }
    }

    /// Parse a listing label (case-insensitive).
    pub fn from_label(s: &str) -> Option<IncidentType> {
        let s = s.trim();
        Self::ALL.into_iter().find(|t| t.label().eq_ignore_ascii_case(s))
    }

    /// Guess the incident type from a free-text report.
    ///
    /// Keywords are checked in order; the first hit wins.  Text with no
    /// known keyword is `Other`.
    pub fn infer_from_description(text: &str) -> IncidentType {
        const RULES: &[(&[&str], IncidentType)] = &[
            (&["closed", "closure", "blocked", "impassable"],        IncidentType::RoadClosure),
            (&["accident", "crash", "collision", "collided"],       IncidentType::Accident),
            (&["construction", "roadwork", "road work", "repair"],  IncidentType::Construction),
            (&["stalled", "broken down", "disabled", "breakdown"],  IncidentType::DisabledVehicle),
            (&["flood", "rain", "storm", "typhoon", "weather"],     IncidentType::Weather),
            (&["mrt", "lrt", "terminal", "transit", "station"],     IncidentType::MassTransitEvent),
            (&["parade", "concert", "rally", "procession", "event"],IncidentType::PlannedEvent),
            (&["lane"],                                             IncidentType::LaneRestriction),
            (&["debris", "pothole", "hazard", "fallen", "spill"],   IncidentType::RoadHazard),
            (&["traffic", "congestion", "jam", "heavy", "slow"],    IncidentType::Congestion),
        ];
        let lower = text.to_lowercase();
        RULES
            .iter()
            .find(|(words, _)| words.iter().any(|w| lower.contains(w)))
            .map(|&(_, t)| t)
            .unwrap_or(IncidentType::Other)
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Severity ──────────────────────────────────────────────────────────────────

/// Disruption severity.  Ordered so that `Heavy > Medium > Light`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Light,
    Medium,
    Heavy,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Light  => "Light",
            Severity::Medium => "Medium",
            Severity::Heavy  => "Heavy",
        }
    }

    pub fn from_label(s: &str) -> Option<Severity> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light"  | "low"      => Some(Severity::Light),
            "medium" | "moderate" => Some(Severity::Medium),
            "heavy"  | "high" | "severe" => Some(Severity::Heavy),
            _ => None,
        }
    }

    /// Bucket a measured speed ratio (scenario import).
    pub fn from_ratio(ratio: f64) -> Severity {
        if ratio < 0.5 {
            Severity::Heavy
        } else if ratio < 0.8 {
            Severity::Medium
        } else {
            Severity::Light
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Target ────────────────────────────────────────────────────────────────────

/// What a disruption report points at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DisruptionTarget {
    /// A single directed edge.
    Edge(EdgeId),
    /// Every edge between the two nodes, in both directions.
    NodePair(NodeId, NodeId),
}

impl DisruptionTarget {
    /// Resolve to a non-empty, sorted edge list.
    pub fn resolve(self, graph: &RoadGraph) -> OverlayResult<Vec<EdgeId>> {
        match self {
            DisruptionTarget::Edge(e) => {
                if e.index() >= graph.edge_count() {
                    return Err(OverlayError::UnknownEdge(e));
                }
                Ok(vec![e])
            }
            DisruptionTarget::NodePair(a, b) => {
                for n in [a, b] {
                    if n.index() >= graph.node_count() {
                        return Err(OverlayError::UnknownNode(n));
                    }
                }
                let edges = graph.edges_between(a, b);
                if edges.is_empty() {
                    return Err(OverlayError::NoEdgesBetween(a, b));
                }
                Ok(edges)
            }
        }
    }
}

// ── NewDisruption ─────────────────────────────────────────────────────────────

/// A disruption report before it is admitted to the overlay.
///
/// `ratio` and `jam_factor` default from the overlay's slowdown table when
/// left as `None`.
#[derive(Clone, Debug)]
pub struct NewDisruption {
    pub target:        DisruptionTarget,
    pub incident_type: IncidentType,
    pub severity:      Severity,
    pub closes_road:   bool,
    pub ratio:         Option<f64>,
    pub jam_factor:    Option<f64>,
    pub reported_at:   Timestamp,
    pub expires_at:    Option<Timestamp>,
    pub road_name:     String,
    pub description:   String,
}

impl NewDisruption {
    /// A report with table-derived slowdown.  Road closures close the road.
    pub fn new(target: DisruptionTarget, incident_type: IncidentType, severity: Severity) -> Self {
        Self {
            target,
            incident_type,
            severity,
            closes_road: incident_type == IncidentType::RoadClosure,
            ratio: None,
            jam_factor: None,
            reported_at: Timestamp::EPOCH,
            expires_at: None,
            road_name: String::new(),
            description: String::new(),
        }
    }

    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = Some(ratio);
        self
    }

    pub fn with_jam_factor(mut self, jam: f64) -> Self {
        self.jam_factor = Some(jam);
        self
    }

    pub fn closed(mut self, closes_road: bool) -> Self {
        self.closes_road = closes_road;
        self
    }

    pub fn reported(mut self, at: Timestamp, ttl_secs: Option<u64>) -> Self {
        self.reported_at = at;
        self.expires_at = ttl_secs.map(|s| at.plus_secs(s));
        self
    }

    pub fn named(mut self, road_name: impl Into<String>, description: impl Into<String>) -> Self {
        self.road_name = road_name.into();
        self.description = description.into();
        self
    }
}

// ── Disruption ────────────────────────────────────────────────────────────────

/// An admitted disruption.  Never edited in place; replacing one means
/// removing it and adding a new one.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Disruption {
    pub id:            DisruptionId,
    pub edges:         Vec<EdgeId>,
    pub incident_type: IncidentType,
    pub severity:      Severity,
    /// Speed multiplier in `(0, 1]`.
    pub ratio:         f64,
    /// Congestion level in `[0, 10]`.
    pub jam_factor:    f64,
    pub closes_road:   bool,
    pub reported_at:   Timestamp,
    pub expires_at:    Option<Timestamp>,
    pub road_name:     String,
    pub description:   String,
}

impl Disruption {
    /// The slowdown this disruption imposes on each of its edges.
    pub fn slowdown(&self) -> Slowdown {
        if self.closes_road {
            Slowdown::Closed
        } else {
            Slowdown::Ratio(self.ratio)
        }
    }

    /// `true` until the expiry time is reached.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.expires_at.is_none_or(|t| now < t)
    }

    /// Severity ordering: closures first, then `Heavy > Medium > Light`,
    /// then lower ratio, then lower id.  `Less` means *more severe*.
    pub fn severity_order(&self, other: &Disruption) -> Ordering {
        other
            .closes_road
            .cmp(&self.closes_road)
            .then(other.severity.cmp(&self.severity))
            .then(self.ratio.total_cmp(&other.ratio))
            .then(self.id.cmp(&other.id))
    }
}
