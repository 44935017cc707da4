//! Edge weights and the overlay seam.
//!
//! All weights are travel times in **milliseconds** (`u32`).  Integer weights
//! make label distances exact: a repaired label and a rebuilt label that
//! describe the same path always compare equal, with no floating-point
//! tolerance involved.
//!
//! The graph never depends on the disruption overlay directly.  Anything that
//! can answer "is this edge slowed or closed?" implements [`EdgeSlowdown`].

use rh_core::EdgeId;

/// Travel time in milliseconds.
pub type Weight = u32;

/// Weight of an impassable edge, and the distance of an unreachable node.
pub const INFINITE_WEIGHT: Weight = Weight::MAX;

/// How an active disruption modifies one edge.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Slowdown {
    /// Speed is multiplied by the ratio (`0 < ratio <= 1`), so travel time is
    /// divided by it.
    Ratio(f64),
    /// The road is closed; the edge cannot be traversed.
    Closed,
}

impl Slowdown {
    /// Apply this slowdown to a base travel time.
    pub fn apply(self, base: Weight) -> Weight {
        match self {
            Slowdown::Closed => INFINITE_WEIGHT,
            Slowdown::Ratio(r) if r <= 0.0 || !r.is_finite() => INFINITE_WEIGHT,
            Slowdown::Ratio(r) => {
                let w = (base as f64 / r.min(1.0)).round();
                if w >= (INFINITE_WEIGHT - 1) as f64 {
                    INFINITE_WEIGHT - 1
                } else {
                    w as Weight
                }
            }
        }
    }
}

/// Source of per-edge slowdowns, implemented by the disruption overlay.
pub trait EdgeSlowdown {
    /// The slowdown currently in effect on `edge`, if any.
    fn slowdown(&self, edge: EdgeId) -> Option<Slowdown>;
}

/// An overlay with no disruptions.
pub struct NoSlowdown;

impl EdgeSlowdown for NoSlowdown {
    #[inline]
    fn slowdown(&self, _edge: EdgeId) -> Option<Slowdown> {
        None
    }
}

/// Saturating weight addition that keeps `INFINITE_WEIGHT` absorbing.
#[inline]
pub fn add_weight(a: Weight, b: Weight) -> Weight {
    if a == INFINITE_WEIGHT || b == INFINITE_WEIGHT {
        INFINITE_WEIGHT
    } else {
        a.saturating_add(b)
    }
}
