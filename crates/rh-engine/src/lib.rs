//! `rh-engine` — routing service over the roadhub label engines.
//!
//! # Request flow
//!
//! ```text
//! route request ──▶ snap origin/destination (R-tree, max snap distance)
//!               ──▶ admit request disruptions (dynamic route only)
//!               ──▶ label query (timed alone)
//!               ──▶ road segments + turn-by-turn text + metrics
//!
//! disruption report ──▶ nearest road ──▶ overlay delta
//!                   ──▶ impact assessment ──▶ immediate repair | lazy flags
//! ```
//!
//! # Crate layout
//!
//! | Module       | Contents                                                     |
//! |--------------|--------------------------------------------------------------|
//! | [`service`]  | `RoutingService`, `Dataset`, disruption intake               |
//! | [`route`]    | `RouteResult`, `RoadSegment`, `TimingMetrics`, impact fields |
//! | [`compare`]  | `Comparison`, reference provider seam, Fréchet and overlap   |
//! | [`observer`] | `ComparisonObserver` for batch runs                          |
//! | [`config`]   | `EngineConfig` (serde, validated)                            |
//! | [`error`]    | `EngineError`, `EngineResult<T>`                             |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let service = RoutingService::from_csv(&nodes, &edges, EngineConfig::default())?;
//! service.report_disruption(&DisruptionReport::described(14.65, 121.03, "Multi-car crash", Severity::Heavy))?;
//! let route = service.compute_route(14.64, 121.02, 14.67, 121.05, &[], None)?;
//! println!("{}", serde_json::to_string_pretty(&route)?);
//! ```

pub mod compare;
pub mod config;
pub mod error;
pub mod observer;
pub mod route;
pub mod service;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use compare::{
    Comparison, ComparisonDiagnostics, Diagnostic, NoReference, OdPair, ReferenceError, ReferenceRoute,
    ReferenceRouteProvider, RouteDiagnostics, discrete_frechet_m, normalize_road_name, random_od_pairs,
    segment_overlap_percent,
};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use observer::{BatchSummary, ComparisonObserver, NoopObserver};
pub use route::{DisruptionImpact, RoadSegment, RouteResult, SnapInfo, TimingMetrics};
pub use service::{
    Dataset, DisruptionAck, DisruptionReport, MaintenanceStatus, RoutingService, ScenarioAck,
};
