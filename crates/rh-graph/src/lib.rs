//! `rh-graph` — road network, spatial snapping, loading, and reference search.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                      |
//! |--------------|---------------------------------------------------------------|
//! | [`network`]  | `RoadGraph` (CSR both directions + R-tree), `RoadGraphBuilder`|
//! | [`weight`]   | `Weight`, `Slowdown`, `EdgeSlowdown` overlay seam             |
//! | [`loader`]   | `load`, CSV node/edge readers                                 |
//! | [`dijkstra`] | Reference one-to-one / one-to-all Dijkstra                    |
//! | [`osm`]      | `load_from_pbf` (feature = `"osm"` only)                      |
//! | [`error`]    | `GraphError`, `DataError`, `GraphResult<T>`                   |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `osm`   | Enables OSM PBF loading via the `osmpbf` crate.             |
//! | `serde` | Derives `Serialize`/`Deserialize` on public types.           |

pub mod dijkstra;
pub mod error;
pub mod loader;
pub mod network;
pub mod weight;

#[cfg(feature = "osm")]
pub mod osm;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use dijkstra::{PathSearch, SearchTree, one_to_all, shortest_path};
pub use error::{DataError, GraphError, GraphResult};
pub use loader::{EdgeRecord, LoadOptions, NodeRecord, load, load_csv, load_readers, road_class_speed_kph};
pub use network::{Direction, Directionality, EdgeSpec, RoadGraph, RoadGraphBuilder};
pub use weight::{EdgeSlowdown, INFINITE_WEIGHT, NoSlowdown, Slowdown, Weight, add_weight};
