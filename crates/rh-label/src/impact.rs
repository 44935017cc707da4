//! Impact scoring and the maintenance state machine.
//!
//! ```text
//!            add / remove
//!   Clean ───────────────▶ DisruptedPending
//!     ▲                        │
//!     │        score >= τ      ├──────────────▶ ImmediateRepair ──┐
//!     │        score <  τ      └──────────────▶ LazyRepairFlagged │
//!     │                                              │            │
//!     └──────── last stale column repaired ◀─────────┘◀───────────┘
//! ```
//!
//! The score of one disruption is `f_Δw · f_jam · f_closure`, clamped to
//! `[0, 1]`:
//!
//! | Factor      | Value                                  |
//! |-------------|----------------------------------------|
//! | `f_Δw`      | `1 − ratio`, or 1 for a closure        |
//! | `f_jam`     | `jam / 10`                             |
//! | `f_closure` | 1.5 for a closure, else 1              |
//!
//! A delta carrying several disruptions scores as its worst one.

use rh_overlay::OverlayDelta;

use crate::error::{LabelError, LabelResult};

/// Default impact threshold τ.
pub const DEFAULT_TAU: f64 = 0.5;

/// Score of a single disruption.
pub fn disruption_score(ratio: f64, jam_factor: f64, closed: bool) -> f64 {
    let f_dw = if closed { 1.0 } else { (1.0 - ratio).clamp(0.0, 1.0) };
    let f_jam = (jam_factor / 10.0).clamp(0.0, 1.0);
    let f_closure = if closed { 1.5 } else { 1.0 };
    (f_dw * f_jam * f_closure).clamp(0.0, 1.0)
}

/// Maximum disruption score carried by `delta`; 0 when it carries none.
pub fn delta_score(delta: &OverlayDelta) -> f64 {
    delta
        .disruptions
        .iter()
        .map(|d| disruption_score(d.ratio, d.jam_factor, d.closes_road))
        .fold(0.0, f64::max)
}

/// Reject thresholds outside `[0, 1]` (and NaN).
pub fn validate_tau(tau: f64) -> LabelResult<f64> {
    if (0.0..=1.0).contains(&tau) {
        Ok(tau)
    } else {
        Err(LabelError::InvalidThreshold(tau))
    }
}

// ── Assessment ────────────────────────────────────────────────────────────────

/// Which label columns a delta may have invalidated, and how much it matters.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ImpactAssessment {
    /// Scalar in `[0, 1]` compared against τ.
    pub score:            f64,
    /// Ids of columns whose stored costs may be wrong.
    pub affected_columns: Vec<u32>,
    pub total_columns:    usize,
    pub changed_edges:    usize,
}

impl ImpactAssessment {
    /// Share of all columns the delta touched.
    pub fn fraction_affected(&self) -> f64 {
        if self.total_columns == 0 {
            0.0
        } else {
            self.affected_columns.len() as f64 / self.total_columns as f64
        }
    }
}

// ── State machine ─────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MaintenanceState {
    Clean,
    DisruptedPending,
    LazyRepairFlagged,
    ImmediateRepair,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RepairStrategy {
    /// Nothing was affected.
    None,
    Immediate,
    Lazy,
}

impl RepairStrategy {
    /// `score >= tau` repairs immediately; the boundary is inclusive.
    pub fn choose(score: f64, tau: f64) -> RepairStrategy {
        if score >= tau {
            RepairStrategy::Immediate
        } else {
            RepairStrategy::Lazy
        }
    }
}

/// Outcome of applying one overlay delta to the dynamic index.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MaintenanceReport {
    pub assessment:       ImpactAssessment,
    pub strategy:         RepairStrategy,
    pub columns_repaired: usize,
    pub columns_flagged:  usize,
    /// States visited, in order, ending in the state the index is left in.
    pub transitions:      Vec<MaintenanceState>,
}

impl MaintenanceReport {
    pub fn final_state(&self) -> MaintenanceState {
        self.transitions.last().copied().unwrap_or(MaintenanceState::Clean)
    }
}
