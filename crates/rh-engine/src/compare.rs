//! Side-by-side comparison of the two engines against a reference route.
//!
//! Diagnostics:
//!
//! - **Fréchet distance**: discrete Fréchet distance between the candidate
//!   and reference polylines, haversine metres.
//! - **Segment overlap**: share of the reference route's distinct road
//!   names (normalized) that the candidate also travels, matched with
//!   Jaro-Winkler similarity.
//!
//! When no reference route is available both diagnostics serialize as the
//! string `"unavailable"`.

use serde::{Serialize, Serializer};
use thiserror::Error;

use rh_core::{GeoPoint, NodeId, ScenarioRng};
use rh_graph::RoadGraph;

use crate::route::{RouteResult, UNKNOWN_ROAD};

/// Minimum Jaro-Winkler similarity for two normalized road names to match.
pub const NAME_MATCH_THRESHOLD: f64 = 0.85;

// ── Reference provider seam ───────────────────────────────────────────────────

/// Route from an external directions service.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferenceRoute {
    pub polyline:   Vec<GeoPoint>,
    pub road_names: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("reference route provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("reference provider found no route")]
    NoRoute,
}

pub trait ReferenceRouteProvider: Send + Sync {
    fn reference_route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<ReferenceRoute, ReferenceError>;
}

/// Provider used when none is configured.
pub struct NoReference;

impl ReferenceRouteProvider for NoReference {
    fn reference_route(&self, _origin: GeoPoint, _destination: GeoPoint) -> Result<ReferenceRoute, ReferenceError> {
        Err(ReferenceError::UpstreamUnavailable("no reference provider configured".into()))
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    Available(f64),
    Unavailable { reason: String },
}

impl Diagnostic {
    pub fn value(&self) -> Option<f64> {
        match self {
            Diagnostic::Available(v) => Some(*v),
            Diagnostic::Unavailable { .. } => None,
        }
    }

    fn from_option(v: Option<f64>, reason: &str) -> Self {
        match v {
            Some(v) => Diagnostic::Available(v),
            None => Diagnostic::Unavailable { reason: reason.to_owned() },
        }
    }
}

impl Serialize for Diagnostic {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Diagnostic::Available(v) => s.serialize_f64(*v),
            Diagnostic::Unavailable { .. } => s.serialize_str("unavailable"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteDiagnostics {
    pub frechet_distance_m:      Diagnostic,
    pub segment_overlap_percent: Diagnostic,
}

impl RouteDiagnostics {
    pub fn unavailable(reason: &str) -> Self {
        Self {
            frechet_distance_m:      Diagnostic::Unavailable { reason: reason.to_owned() },
            segment_overlap_percent: Diagnostic::Unavailable { reason: reason.to_owned() },
        }
    }

    pub fn against(route: &RouteResult, reference: &ReferenceRoute) -> Self {
        Self {
            frechet_distance_m: Diagnostic::from_option(
                discrete_frechet_m(&route.coordinates, &reference.polyline),
                "empty polyline",
            ),
            segment_overlap_percent: Diagnostic::from_option(
                segment_overlap_percent(&reference.road_names, &route.road_names()),
                "reference route has no named roads",
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonDiagnostics {
    pub dhl:  RouteDiagnostics,
    pub hc2l: RouteDiagnostics,
}

/// Both engines' answers for one origin/destination on one snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comparison {
    pub dhl:             RouteResult,
    pub hc2l:            RouteResult,
    pub diagnostics:     ComparisonDiagnostics,
    pub use_disruptions: bool,
    /// Both engines returned the same travel time.
    pub agree:           bool,
}

impl Comparison {
    pub fn new(
        dhl: RouteResult,
        hc2l: RouteResult,
        use_disruptions: bool,
        reference: Result<ReferenceRoute, ReferenceError>,
    ) -> Self {
        let diagnostics = match reference {
            Ok(r) => ComparisonDiagnostics {
                dhl:  RouteDiagnostics::against(&dhl, &r),
                hc2l: RouteDiagnostics::against(&hc2l, &r),
            },
            Err(e) => {
                tracing::warn!(error = %e, "reference route unavailable, diagnostics skipped");
                let reason = e.to_string();
                ComparisonDiagnostics {
                    dhl:  RouteDiagnostics::unavailable(&reason),
                    hc2l: RouteDiagnostics::unavailable(&reason),
                }
            }
        };
        let agree = (dhl.total_time_s - hc2l.total_time_s).abs() < 1e-9;
        if !agree {
            tracing::error!(dhl = dhl.total_time_s, hc2l = hc2l.total_time_s, "engines disagree on travel time");
        }
        Self { dhl, hc2l, diagnostics, use_disruptions, agree }
    }
}

// ── Fréchet ───────────────────────────────────────────────────────────────────

/// Discrete Fréchet distance in metres; `None` if either polyline is empty.
pub fn discrete_frechet_m(a: &[GeoPoint], b: &[GeoPoint]) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    // Two rolling rows of the coupling table.
    let mut prev = vec![0.0f64; b.len()];
    let mut cur = vec![0.0f64; b.len()];
    for (i, &p) in a.iter().enumerate() {
        for (j, &q) in b.iter().enumerate() {
            let d = p.distance_m(q);
            cur[j] = match (i, j) {
                (0, 0) => d,
                (0, _) => cur[j - 1].max(d),
                (_, 0) => prev[0].max(d),
                _ => prev[j].min(prev[j - 1]).min(cur[j - 1]).max(d),
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev.last().copied()
}

// ── Segment overlap ───────────────────────────────────────────────────────────

/// Lower-case, strip punctuation, collapse whitespace, and expand common
/// street-type abbreviations.
pub fn normalize_road_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .map(|w| match w {
            "st" => "street",
            "ave" | "av" => "avenue",
            "rd" => "road",
            "blvd" => "boulevard",
            "hwy" => "highway",
            "dr" => "drive",
            "ext" => "extension",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Percentage of distinct reference road names matched in `candidate`.
/// `None` when the reference has no usable names.
pub fn segment_overlap_percent(reference: &[String], candidate: &[String]) -> Option<f64> {
    let distinct = |names: &[String]| {
        let mut out: Vec<String> = Vec::new();
        for n in names {
            if n == UNKNOWN_ROAD {
                continue;
            }
            let n = normalize_road_name(n);
            if !n.is_empty() && !out.contains(&n) {
                out.push(n);
            }
        }
        out
    };
    let reference = distinct(reference);
    if reference.is_empty() {
        return None;
    }
    let candidate = distinct(candidate);
    let matched = reference
        .iter()
        .filter(|r| candidate.iter().any(|c| strsim::jaro_winkler(r, c) >= NAME_MATCH_THRESHOLD))
        .count();
    Some(matched as f64 / reference.len() as f64 * 100.0)
}

// ── Origin/destination sampling ───────────────────────────────────────────────

/// A query endpoint pair.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct OdPair {
    pub origin:      GeoPoint,
    pub destination: GeoPoint,
}

/// `count` pairs of distinct random nodes, as coordinates.
pub fn random_od_pairs(graph: &RoadGraph, rng: &mut ScenarioRng, count: usize) -> Vec<OdPair> {
    let n = graph.node_count() as u32;
    if n < 2 {
        return Vec::new();
    }
    (0..count)
        .map(|_| {
            let s = rng.gen_range(0..n);
            let mut t = rng.gen_range(0..n - 1);
            if t >= s {
                t += 1;
            }
            OdPair {
                origin:      graph.node_pos[NodeId(s).index()],
                destination: graph.node_pos[NodeId(t).index()],
            }
        })
        .collect()
}
