//! Plain data row types written by output backends.

use rh_engine::{Comparison, RouteDiagnostics, RouteResult};

/// Metrics of one engine's answer for one origin/destination pair.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMetricRow {
    /// Run label, e.g. `"baseline"` or `"disrupted"`.
    pub run:              String,
    pub pair:             u64,
    /// `"DHL"` or `"HC2L"`.
    pub engine:           String,
    /// External node ids of the snapped endpoints.
    pub origin_node:      u64,
    pub destination_node: u64,
    pub distance_m:       f64,
    pub time_s:           f64,
    pub query_ms:         f64,
    pub labeling_ms:      f64,
    pub labeling_bytes:   u64,
    pub label_entries:    u64,
    pub fallback:         bool,
    /// `None` when no reference route was available.
    pub frechet_m:        Option<f64>,
    pub overlap_percent:  Option<f64>,
}

impl QueryMetricRow {
    pub fn from_route(run: &str, pair: u64, route: &RouteResult, diagnostics: &RouteDiagnostics) -> Self {
        let t = &route.timing_metrics;
        Self {
            run:              run.to_owned(),
            pair,
            engine:           route.engine.clone(),
            origin_node:      route.origin.external_id,
            destination_node: route.destination.external_id,
            distance_m:       route.total_distance_m,
            time_s:           route.total_time_s,
            query_ms:         t.query_response_time,
            labeling_ms:      t.labeling_time,
            labeling_bytes:   t.labeling_size as u64,
            label_entries:    t.label_entries as u64,
            fallback:         route.fallback,
            frechet_m:        diagnostics.frechet_distance_m.value(),
            overlap_percent:  diagnostics.segment_overlap_percent.value(),
        }
    }

    /// The DHL and HC2L rows of one comparison.
    pub fn pair_rows(run: &str, pair: u64, c: &Comparison) -> [QueryMetricRow; 2] {
        [
            Self::from_route(run, pair, &c.dhl, &c.diagnostics.dhl),
            Self::from_route(run, pair, &c.hc2l, &c.diagnostics.hc2l),
        ]
    }
}

/// Totals for one comparison batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummaryRow {
    pub run:                String,
    pub pairs:              u64,
    pub succeeded:          u64,
    pub failed:             u64,
    pub disagreements:      u64,
    pub mean_dhl_query_ms:  f64,
    pub mean_hc2l_query_ms: f64,
}
