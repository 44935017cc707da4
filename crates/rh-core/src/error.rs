//! Shared error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant where they need it.

use thiserror::Error;

use crate::NodeId;

/// The base error type for `rh-core` and a common building block for
/// sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("coordinate ({lat}, {lng}) is outside the valid WGS-84 range")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Shorthand result type for `rh-core`.
pub type CoreResult<T> = Result<T, CoreError>;
