//! Overlay error types.

use thiserror::Error;

use rh_core::{EdgeId, NodeId};

use crate::disruption::Severity;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("slowdown ratio {0} is outside (0, 1]")]
    InvalidRatio(f64),

    #[error("jam factor {0} is outside [0, 10]")]
    InvalidJamFactor(f64),

    #[error("{severity:?} slowdown {ratio} is outside its band {band}")]
    InvalidTable { severity: Severity, ratio: f64, band: &'static str },

    #[error("edge {0} does not exist")]
    UnknownEdge(EdgeId),

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("no road connects {0} and {1}")]
    NoEdgesBetween(NodeId, NodeId),

    #[error("scenario CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type OverlayResult<T> = Result<T, OverlayError>;
