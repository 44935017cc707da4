//! `rh-core` — foundational types for the `roadhub` routing engine.
//!
//! This crate is a dependency of every other `rh-*` crate.  It intentionally
//! has no `rh-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `NodeId`, `EdgeId`, `DisruptionId`                    |
//! | [`geo`]         | `GeoPoint`, haversine distance, midpoint              |
//! | [`time`]        | `Timestamp` (Unix seconds)                            |
//! | [`rng`]         | `ScenarioRng` (seeded, for synthetic disruptions)     |
//! | [`error`]       | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::{DisruptionId, EdgeId, NodeId};
pub use rng::ScenarioRng;
pub use time::Timestamp;
