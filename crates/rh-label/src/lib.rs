//! `rh-label` — hub-label indexes for point-to-point shortest paths.
//!
//! Two engines answer the same queries under the same tie rule (lowest
//! travel time, then fewest edges):
//!
//! | Engine          | Build                         | On overlay change                  |
//! |-----------------|-------------------------------|------------------------------------|
//! | `HubLabels`     | Pruned landmark labeling      | Full rebuild (`StaticEngine`)      |
//! | `DynamicLabels` | Cut hierarchy, per-hub columns| Assess, then immediate or lazy repair |
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`label`]     | `Cost`, `LabelPath`, `LabelStats`, `LabelEngine` trait      |
//! | [`static_hl`] | `HubLabels`, `StaticEngine` (version-keyed cache)           |
//! | [`hierarchy`] | `PartitionTree` (geometric bisection with vertex cuts)      |
//! | [`dynamic`]   | `DynamicLabels` and its maintenance protocol                |
//! | [`impact`]    | Impact score, `ImpactAssessment`, `MaintenanceState`        |
//! | [`error`]     | `LabelError`, `LabelResult<T>`                              |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                   |
//! |------------|----------------------------------------------------------|
//! | `parallel` | Builds and repairs dynamic columns on Rayon's pool.      |
//! | `serde`    | Derives `Serialize` on reports, states, and stats.       |

pub mod dynamic;
pub mod error;
pub mod hierarchy;
pub mod impact;
pub mod label;
pub mod static_hl;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use dynamic::DynamicLabels;
pub use error::{LabelError, LabelResult};
pub use hierarchy::{DEFAULT_LEAF_SIZE, PartitionTree};
pub use impact::{
    DEFAULT_TAU, ImpactAssessment, MaintenanceReport, MaintenanceState, RepairStrategy, delta_score,
    disruption_score, validate_tau,
};
pub use label::{Cost, LabelEngine, LabelPath, LabelStats};
pub use static_hl::{HubLabels, StaticEngine};
