//! Graph-subsystem error types.

use thiserror::Error;

use rh_core::NodeId;

/// Malformed graph input.  A load that produces one of these is rejected as
/// a whole; no partial graph is ever returned.
#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("edge #{edge} references unknown node {node}")]
    UnknownNode { edge: usize, node: u64 },

    #[error("edge #{edge} has non-positive base length {length_m}")]
    NonPositiveLength { edge: usize, length_m: f64 },

    #[error("edge #{edge} has zero base travel time")]
    ZeroTravelTime { edge: usize },

    #[error("node id {0} appears more than once")]
    DuplicateNode(u64),

    #[error("node {id} has invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { id: u64, lat: f64, lng: f64 },
}

/// Errors produced by `rh-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid graph data: {0}")]
    Data(#[from] DataError),

    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("node {0} not found in graph")]
    NodeNotFound(NodeId),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "osm")]
    #[error("OSM parse error: {0}")]
    Osm(String),
}

pub type GraphResult<T> = Result<T, GraphError>;
