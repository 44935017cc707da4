//! Label-engine error types.

use thiserror::Error;

use rh_core::NodeId;
use rh_graph::GraphError;

#[derive(Debug, Error)]
pub enum LabelError {
    /// No path exists between the two nodes under current weights.
    #[error("{to} is unreachable from {from}")]
    Unreachable { from: NodeId, to: NodeId },

    #[error("impact threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),

    /// A label column contradicted the graph.  Indicates a maintenance bug;
    /// logged at error level where it is raised.
    #[error("stale label index: {0}")]
    StaleIndex(String),

    #[error("node {0} is not in the labeled graph")]
    NodeOutOfRange(NodeId),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type LabelResult<T> = Result<T, LabelError>;
