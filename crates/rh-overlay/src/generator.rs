//! Synthetic disruption generator.
//!
//! Picks random road segments and assigns each a random incident.  The same
//! seed always yields the same reports on the same graph.

use rustc_hash::FxHashSet;

use rh_core::{ScenarioRng, Timestamp};
use rh_graph::RoadGraph;

use crate::disruption::{DisruptionTarget, IncidentType, NewDisruption, Severity};

/// Generator settings.
#[derive(Clone, Debug)]
pub struct GeneratorOptions {
    /// Number of road segments to disrupt (capped by the number available).
    pub count:               usize,
    /// Probability that a generated disruption is a road closure.
    pub closure_probability: f64,
    /// Lifetime of generated disruptions; `None` never expires.
    pub ttl_secs:            Option<u64>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self { count: 10, closure_probability: 0.1, ttl_secs: Some(3_600) }
    }
}

/// Generate up to `opts.count` reports on distinct road segments.
pub fn generate(
    graph: &RoadGraph,
    rng: &mut ScenarioRng,
    opts: &GeneratorOptions,
    now: Timestamp,
) -> Vec<NewDisruption> {
    let edge_count = graph.edge_count();
    let mut out = Vec::with_capacity(opts.count);
    if edge_count == 0 {
        return out;
    }

    // Unordered endpoint pairs already used, so two-way roads are not hit twice.
    let mut used: FxHashSet<(u32, u32)> = FxHashSet::default();
    let mut attempts = 0usize;
    let max_attempts = opts.count.saturating_mul(20).max(100);

    while out.len() < opts.count && attempts < max_attempts {
        attempts += 1;
        let e = rh_core::EdgeId(rng.gen_range(0..edge_count as u32));
        let (a, b) = graph.endpoints(e);
        let key = (a.0.min(b.0), a.0.max(b.0));
        if !used.insert(key) {
            continue;
        }

        let closes = rng.gen_bool(opts.closure_probability);
        let (incident, severity) = if closes {
            (IncidentType::RoadClosure, Severity::Heavy)
        } else {
            let open_types = &IncidentType::ALL[1..IncidentType::ALL.len() - 1];
            let incident = rng.choose(open_types).copied().unwrap_or(IncidentType::Congestion);
            let severity = match rng.gen_range(0..10u32) {
                0..=2 => Severity::Heavy,
                3..=6 => Severity::Medium,
                _     => Severity::Light,
            };
            (incident, severity)
        };

        out.push(
            NewDisruption::new(DisruptionTarget::NodePair(a, b), incident, severity)
                .closed(closes)
                .reported(now, opts.ttl_secs)
                .named(graph.road_name(e), format!("synthetic {}", incident.label().to_lowercase())),
        );
    }

    tracing::debug!(generated = out.len(), attempts, "synthetic disruptions generated");
    out
}
