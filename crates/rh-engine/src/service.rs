//! The routing service: one explicit handle over a dataset snapshot.
//!
//! # Locking
//!
//! ```text
//! RoutingService
//!   current: RwLock<Arc<Dataset>>        swapped wholesale by reload()
//!     Dataset
//!       graph, base labels               immutable
//!       static_engine                    version-keyed cache
//!       live: RwLock<LiveState>          overlay + dynamic labels
//! ```
//!
//! Queries clone the current `Arc<Dataset>` and take a read lock on its live
//! state; a reload never disturbs them.  Disruption intake takes the write
//! lock, so immediate repair finishes before any query observes the new
//! overlay.  Lazy repair happens inside queries under the read lock, column
//! by column.

use std::io::Read;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use serde::Serialize;

use rh_core::{DisruptionId, GeoPoint, ScenarioRng, Timestamp};
use rh_graph::{LoadOptions, NoSlowdown, RoadGraph, load_csv};
use rh_label::{
    DynamicLabels, HubLabels, LabelEngine, MaintenanceReport, MaintenanceState, StaticEngine, validate_tau,
};
use rh_overlay::{
    DisruptionOverlay, DisruptionSummary, DisruptionTarget, GeneratorOptions, IncidentType, NewDisruption,
    OverlayDelta, Severity, generate, read_scenario, summarize,
};

use crate::compare::{Comparison, NoReference, OdPair, ReferenceRouteProvider};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::observer::{BatchSummary, ComparisonObserver};
use crate::route::{DisruptionImpact, RouteResult, SnapInfo, TimingMetrics, path_length_m};

// ── Requests & acknowledgements ───────────────────────────────────────────────

/// A disruption reported at a coordinate.
///
/// The disruption covers the road at the nearest node whose midpoint is
/// closest to the coordinate, in both directions.
#[derive(Clone, Debug, PartialEq)]
pub struct DisruptionReport {
    pub lat:           f64,
    pub lng:           f64,
    /// Inferred from `description` when absent.
    pub incident_type: Option<IncidentType>,
    pub severity:      Severity,
    pub description:   String,
    /// Overrides the closure flag implied by the incident type.
    pub closes_road:   Option<bool>,
}

impl DisruptionReport {
    pub fn described(lat: f64, lng: f64, description: impl Into<String>, severity: Severity) -> Self {
        Self { lat, lng, incident_type: None, severity, description: description.into(), closes_road: None }
    }

    pub fn typed(lat: f64, lng: f64, incident_type: IncidentType, severity: Severity) -> Self {
        Self { lat, lng, incident_type: Some(incident_type), severity, description: String::new(), closes_road: None }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisruptionAck {
    pub id:              DisruptionId,
    pub incident_type:   IncidentType,
    pub severity:        Severity,
    pub road_name:       String,
    pub edges:           usize,
    pub overlay_version: u64,
    pub maintenance:     MaintenanceReport,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioAck {
    pub admitted:    usize,
    /// Rows that carried no slowdown.
    pub skipped:     usize,
    /// Rows whose endpoints did not resolve to a road.
    pub unresolved:  usize,
    pub maintenance: Option<MaintenanceReport>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MaintenanceStatus {
    pub state:              MaintenanceState,
    pub stale_columns:      usize,
    pub total_columns:      usize,
    pub lazy_repairs:       usize,
    pub overlay_version:    u64,
    pub active_disruptions: usize,
    pub last_report:        Option<MaintenanceReport>,
}

// ── Dataset ───────────────────────────────────────────────────────────────────

struct LiveState {
    overlay:     DisruptionOverlay,
    dynamic:     DynamicLabels,
    last_report: Option<MaintenanceReport>,
}

/// One loaded graph with every index built over it.
pub struct Dataset {
    graph:         Arc<RoadGraph>,
    /// Labels over undisrupted weights; never updated.
    base_static:   HubLabels,
    base_dynamic:  DynamicLabels,
    static_engine: StaticEngine,
    live:          RwLock<LiveState>,
}

impl Dataset {
    fn build(graph: RoadGraph, config: &EngineConfig) -> Dataset {
        let start = Instant::now();
        let graph = Arc::new(graph);
        let base_weights = graph.weights(&NoSlowdown);
        let base_static = HubLabels::build(&graph, &base_weights);
        let base_dynamic = DynamicLabels::build(Arc::clone(&graph), base_weights.clone(), config.leaf_size);
        let dynamic = DynamicLabels::build(Arc::clone(&graph), base_weights, config.leaf_size);
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
            "dataset ready"
        );
        Dataset {
            graph,
            base_static,
            base_dynamic,
            static_engine: StaticEngine::new(),
            live: RwLock::new(LiveState {
                overlay: DisruptionOverlay::new(config.slowdown),
                dynamic,
                last_report: None,
            }),
        }
    }

    pub fn graph(&self) -> &Arc<RoadGraph> {
        &self.graph
    }

    fn read_live(&self) -> RwLockReadGuard<'_, LiveState> {
        self.live.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_live(&self) -> RwLockWriteGuard<'_, LiveState> {
        self.live.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── RoutingService ────────────────────────────────────────────────────────────

pub struct RoutingService {
    config:    EngineConfig,
    reference: Box<dyn ReferenceRouteProvider>,
    current:   RwLock<Arc<Dataset>>,
}

impl RoutingService {
    /// Build every index over `graph`.
    pub fn new(graph: RoadGraph, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let dataset = Dataset::build(graph, &config);
        Ok(Self { config, reference: Box::new(NoReference), current: RwLock::new(Arc::new(dataset)) })
    }

    /// Load `nodes.csv` / `edges.csv` and build the service.
    pub fn from_csv(nodes: &Path, edges: &Path, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let graph = load_csv(nodes, edges, &LoadOptions { default_speed_kph: config.default_speed_kph })?;
        Self::new(graph, config)
    }

    /// Use `provider` for comparison diagnostics.
    pub fn with_reference(mut self, provider: impl ReferenceRouteProvider + 'static) -> Self {
        self.reference = Box::new(provider);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current snapshot.  Stays valid across reloads.
    pub fn dataset(&self) -> Arc<Dataset> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Replace the graph.  Disruptions are dropped with the old dataset.
    pub fn reload(&self, graph: RoadGraph) {
        let dataset = Arc::new(Dataset::build(graph, &self.config));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = dataset;
        tracing::info!("dataset reloaded");
    }

    pub fn reload_csv(&self, nodes: &Path, edges: &Path) -> EngineResult<()> {
        let graph = load_csv(nodes, edges, &LoadOptions { default_speed_kph: self.config.default_speed_kph })?;
        self.reload(graph);
        Ok(())
    }

    // ── Routing ───────────────────────────────────────────────────────────

    /// Route on the dynamic engine.  `user_disruptions` are admitted to the
    /// overlay first and repaired according to `tau` (default from config).
    pub fn compute_route(
        &self,
        origin_lat: f64,
        origin_lng: f64,
        dest_lat: f64,
        dest_lng: f64,
        user_disruptions: &[DisruptionReport],
        tau: Option<f64>,
    ) -> EngineResult<RouteResult> {
        let tau = validate_tau(tau.unwrap_or(self.config.default_tau))?;
        let ds = self.dataset();
        let origin = self.snap(&ds.graph, origin_lat, origin_lng)?;
        let destination = self.snap(&ds.graph, dest_lat, dest_lng)?;

        let mut strategy = None;
        if !user_disruptions.is_empty() {
            let batch = user_disruptions
                .iter()
                .map(|r| self.resolve_report(&ds.graph, r))
                .collect::<EngineResult<Vec<_>>>()?;
            let mut live = ds.write_live();
            if let Some(report) = admit(&ds.graph, &mut live, batch, tau)? {
                strategy = Some(report.strategy);
            }
        }

        let live = ds.read_live();
        let (s, t) = (origin.node, destination.node);
        let mut route = route_with(&ds.graph, &live.dynamic, origin, destination)?;
        let base = ds.base_static.path(s, t)?;
        let mut impact = DisruptionImpact::new(
            path_length_m(&ds.graph, &base),
            route.total_distance_m,
            live.overlay.len(),
            live.dynamic.state(),
        );
        impact.repair_strategy = strategy;
        route.impact = Some(impact);
        Ok(route)
    }

    /// Route on static labels rebuilt for the current overlay.
    pub fn compute_route_static(
        &self,
        origin_lat: f64,
        origin_lng: f64,
        dest_lat: f64,
        dest_lng: f64,
    ) -> EngineResult<RouteResult> {
        let ds = self.dataset();
        let origin = self.snap(&ds.graph, origin_lat, origin_lng)?;
        let destination = self.snap(&ds.graph, dest_lat, dest_lng)?;
        let labels = {
            let live = ds.read_live();
            let (labels, rebuilt) = ds.static_engine.labels_for(&ds.graph, &live.overlay);
            if rebuilt {
                tracing::info!(version = live.overlay.version(), "static labels rebuilt for query");
            }
            labels
        };
        route_with(&ds.graph, labels.as_ref(), origin, destination)
    }

    /// Both engines on the same snapshot, with reference diagnostics.
    pub fn compare_routes(
        &self,
        origin_lat: f64,
        origin_lng: f64,
        dest_lat: f64,
        dest_lng: f64,
        use_disruptions: bool,
    ) -> EngineResult<Comparison> {
        let ds = self.dataset();
        let origin = self.snap(&ds.graph, origin_lat, origin_lng)?;
        let destination = self.snap(&ds.graph, dest_lat, dest_lng)?;

        let (dhl, hc2l) = {
            let live = ds.read_live();
            if use_disruptions {
                let (labels, _) = ds.static_engine.labels_for(&ds.graph, &live.overlay);
                (
                    route_with(&ds.graph, labels.as_ref(), origin.clone(), destination.clone())?,
                    route_with(&ds.graph, &live.dynamic, origin.clone(), destination.clone())?,
                )
            } else {
                (
                    route_with(&ds.graph, &ds.base_static, origin.clone(), destination.clone())?,
                    route_with(&ds.graph, &ds.base_dynamic, origin.clone(), destination.clone())?,
                )
            }
        };

        let reference = self.reference.reference_route(origin.requested, destination.requested);
        Ok(Comparison::new(dhl, hc2l, use_disruptions, reference))
    }

    /// Compare every pair, reporting each to `observer`.
    pub fn compare_batch<O: ComparisonObserver>(
        &self,
        pairs: &[OdPair],
        use_disruptions: bool,
        observer: &mut O,
    ) -> BatchSummary {
        let mut summary = BatchSummary { pairs: pairs.len(), ..BatchSummary::default() };
        let (mut dhl_ms, mut hc2l_ms) = (0.0, 0.0);
        for (i, pair) in pairs.iter().enumerate() {
            let result = self.compare_routes(
                pair.origin.lat,
                pair.origin.lng,
                pair.destination.lat,
                pair.destination.lng,
                use_disruptions,
            );
            match result {
                Ok(c) => {
                    summary.succeeded += 1;
                    if !c.agree {
                        summary.disagreements += 1;
                    }
                    dhl_ms += c.dhl.timing_metrics.query_response_time;
                    hc2l_ms += c.hc2l.timing_metrics.query_response_time;
                    observer.on_comparison(i, pair, &c);
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::debug!(pair = i, error = %e, "comparison failed");
                    observer.on_failure(i, pair, &e);
                }
            }
        }
        if summary.succeeded > 0 {
            summary.mean_dhl_query_ms = dhl_ms / summary.succeeded as f64;
            summary.mean_hc2l_query_ms = hc2l_ms / summary.succeeded as f64;
        }
        tracing::info!(
            pairs = summary.pairs,
            failed = summary.failed,
            disagreements = summary.disagreements,
            mean_dhl_ms = summary.mean_dhl_query_ms,
            mean_hc2l_ms = summary.mean_hc2l_query_ms,
            "comparison batch finished"
        );
        observer.on_batch_end(&summary);
        summary
    }

    // ── Disruptions ───────────────────────────────────────────────────────

    pub fn report_disruption(&self, report: &DisruptionReport) -> EngineResult<DisruptionAck> {
        let ds = self.dataset();
        let new = self.resolve_report(&ds.graph, report)?;
        let (incident_type, severity, road_name) = (new.incident_type, new.severity, new.road_name.clone());

        let mut live = ds.write_live();
        let delta = live.overlay.add(&ds.graph, new)?;
        let id = delta.added().next().unwrap_or(DisruptionId::INVALID);
        let edges = live.overlay.get(id).map_or(0, |d| d.edges.len());
        let maintenance = apply(&mut live, &delta, self.config.default_tau)?;
        tracing::info!(
            disruption = %id,
            incident = incident_type.label(),
            severity = severity.label(),
            road = %road_name,
            strategy = ?maintenance.strategy,
            "disruption reported"
        );
        Ok(DisruptionAck {
            id,
            incident_type,
            severity,
            road_name,
            edges,
            overlay_version: live.overlay.version(),
            maintenance,
        })
    }

    /// Remove one disruption.  Unknown ids are a no-op.
    pub fn remove_disruption(&self, id: DisruptionId) -> EngineResult<MaintenanceReport> {
        let ds = self.dataset();
        let mut live = ds.write_live();
        let delta = live.overlay.remove(&ds.graph, id);
        apply(&mut live, &delta, self.config.default_tau)
    }

    pub fn expire_disruptions(&self, now: Timestamp) -> EngineResult<MaintenanceReport> {
        let ds = self.dataset();
        let mut live = ds.write_live();
        let delta = live.overlay.expire(&ds.graph, now);
        apply(&mut live, &delta, self.config.default_tau)
    }

    pub fn clear_disruptions(&self) -> EngineResult<MaintenanceReport> {
        let ds = self.dataset();
        let mut live = ds.write_live();
        let delta = live.overlay.clear(&ds.graph);
        apply(&mut live, &delta, self.config.default_tau)
    }

    /// Import a traffic-scenario CSV into the overlay.
    pub fn load_scenario<R: Read>(&self, reader: R) -> EngineResult<ScenarioAck> {
        let ds = self.dataset();
        let import = read_scenario(reader, &ds.graph, Timestamp::now(), self.config.default_disruption_ttl_secs)?;
        let admitted = import.disruptions.len();
        let mut live = ds.write_live();
        let maintenance = admit(&ds.graph, &mut live, import.disruptions, self.config.default_tau)?;
        tracing::info!(admitted, skipped = import.skipped, unresolved = import.unresolved, "scenario loaded");
        Ok(ScenarioAck { admitted, skipped: import.skipped, unresolved: import.unresolved, maintenance })
    }

    /// Admit seeded synthetic disruptions.
    pub fn simulate_disruptions(
        &self,
        rng: &mut ScenarioRng,
        opts: &GeneratorOptions,
    ) -> EngineResult<Option<MaintenanceReport>> {
        let ds = self.dataset();
        let batch = generate(&ds.graph, rng, opts, Timestamp::now());
        let mut live = ds.write_live();
        admit(&ds.graph, &mut live, batch, self.config.default_tau)
    }

    pub fn list_active_disruptions(&self) -> DisruptionSummary {
        let ds = self.dataset();
        let live = ds.read_live();
        summarize(&live.overlay, &ds.graph, Timestamp::now())
    }

    // ── Maintenance ───────────────────────────────────────────────────────

    pub fn maintenance_state(&self) -> MaintenanceStatus {
        let ds = self.dataset();
        let live = ds.read_live();
        MaintenanceStatus {
            state:              live.dynamic.state(),
            stale_columns:      live.dynamic.stale_columns(),
            total_columns:      live.dynamic.column_count(),
            lazy_repairs:       live.dynamic.lazy_repairs(),
            overlay_version:    live.overlay.version(),
            active_disruptions: live.overlay.len(),
            last_report:        live.last_report.clone(),
        }
    }

    /// Repair every stale column now.
    pub fn repair_all(&self) -> usize {
        let ds = self.dataset();
        let mut live = ds.write_live();
        live.dynamic.repair_all()
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    fn snap(&self, graph: &RoadGraph, lat: f64, lng: f64) -> EngineResult<SnapInfo> {
        let requested = GeoPoint::checked(lat, lng)?;
        let Some((node, distance_m)) = graph.nearest_node(requested) else {
            return Err(EngineError::NoNearbyNode { lat, lng, nearest_m: None });
        };
        if let Some(max) = self.config.max_snap_distance_m {
            if distance_m > max {
                return Err(EngineError::NoNearbyNode { lat, lng, nearest_m: Some(distance_m) });
            }
        }
        Ok(SnapInfo {
            requested,
            node,
            external_id: graph.node_ext_id[node.index()],
            position: graph.node_pos[node.index()],
            distance_m,
        })
    }

    fn resolve_report(&self, graph: &RoadGraph, report: &DisruptionReport) -> EngineResult<NewDisruption> {
        let snap = self.snap(graph, report.lat, report.lng)?;
        let midpoint_m = |e: rh_core::EdgeId| {
            let (a, b) = graph.endpoints(e);
            graph.node_pos[a.index()].midpoint(graph.node_pos[b.index()]).distance_m(snap.requested)
        };
        let edge = graph
            .out_edges(snap.node)
            .chain(graph.in_edges(snap.node))
            .min_by(|&a, &b| midpoint_m(a).total_cmp(&midpoint_m(b)).then(a.cmp(&b)))
            .ok_or(EngineError::NoNearbyNode { lat: report.lat, lng: report.lng, nearest_m: Some(snap.distance_m) })?;
        let (from, to) = graph.endpoints(edge);

        let incident_type = report
            .incident_type
            .unwrap_or_else(|| IncidentType::infer_from_description(&report.description));
        let mut new = NewDisruption::new(DisruptionTarget::NodePair(from, to), incident_type, report.severity)
            .reported(Timestamp::now(), self.config.default_disruption_ttl_secs)
            .named(graph.road_name(edge), report.description.clone());
        if let Some(closed) = report.closes_road {
            new = new.closed(closed);
        }
        Ok(new)
    }
}

// ── Free helpers ──────────────────────────────────────────────────────────────

fn route_with(
    graph: &RoadGraph,
    engine: &dyn LabelEngine,
    origin: SnapInfo,
    destination: SnapInfo,
) -> EngineResult<RouteResult> {
    let start = Instant::now();
    let path = engine.query(origin.node, destination.node)?;
    let query_ms = start.elapsed().as_secs_f64() * 1e3;
    tracing::debug!(
        engine = engine.name(),
        from = %origin.node,
        to = %destination.node,
        query_ms,
        hops = path.hops(),
        "label query answered"
    );
    let timing = TimingMetrics::new(query_ms, engine.stats());
    Ok(RouteResult::assemble(graph, engine.name(), origin, destination, &path, timing))
}

/// Push one delta through the dynamic index and remember the report.
fn apply(live: &mut LiveState, delta: &OverlayDelta, tau: f64) -> EngineResult<MaintenanceReport> {
    let report = live.dynamic.apply_delta(delta, tau)?;
    live.last_report = Some(report.clone());
    Ok(report)
}

/// Admit a batch as one maintenance cycle.  If a report is rejected
/// part-way, the ones admitted before it are still applied to the index
/// before the error is returned.
fn admit(
    graph: &RoadGraph,
    live: &mut LiveState,
    batch: Vec<NewDisruption>,
    tau: f64,
) -> EngineResult<Option<MaintenanceReport>> {
    let mut merged: Option<OverlayDelta> = None;
    let mut failure = None;
    for new in batch {
        match live.overlay.add(graph, new) {
            Ok(delta) => match merged.as_mut() {
                Some(m) => m.merge(delta),
                None => merged = Some(delta),
            },
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    let report = match merged {
        Some(delta) => Some(apply(live, &delta, tau)?),
        None => None,
    };
    match failure {
        Some(e) => Err(e.into()),
        None => Ok(report),
    }
}
