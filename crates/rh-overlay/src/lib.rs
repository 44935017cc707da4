//! `rh-overlay` — disruptions layered over an immutable road graph.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                   |
//! |----------------|------------------------------------------------------------|
//! | [`disruption`] | `Disruption`, `NewDisruption`, `IncidentType`, `Severity`  |
//! | [`table`]      | `SlowdownTable` (validated severity → ratio bands)         |
//! | [`overlay`]    | `DisruptionOverlay`, `OverlayDelta`, `EdgeChange`          |
//! | [`scenario`]   | Traffic-scenario CSV import and incident classification   |
//! | [`generator`]  | Seeded synthetic disruptions                               |
//! | [`summary`]    | Listing grouped by incident type                           |
//! | [`error`]      | `OverlayError`, `OverlayResult<T>`                         |
//!
//! The overlay implements [`rh_graph::EdgeSlowdown`], so a graph can compute
//! effective weights without knowing about disruptions.

pub mod disruption;
pub mod error;
pub mod generator;
pub mod overlay;
pub mod scenario;
pub mod summary;
pub mod table;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use disruption::{Disruption, DisruptionTarget, IncidentType, NewDisruption, Severity};
pub use error::{OverlayError, OverlayResult};
pub use generator::{GeneratorOptions, generate};
pub use overlay::{DeltaKind, DisruptionEffect, DisruptionOverlay, EdgeChange, OverlayDelta};
pub use scenario::{RowContext, RowMeasure, ScenarioImport, classify_incident, read_scenario};
pub use summary::{DisruptionSummary, DisruptionView, SeverityCounts, TypeGroup, summarize};
pub use table::SlowdownTable;
