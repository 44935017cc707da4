use thiserror::Error;

use rh_core::CoreError;
use rh_graph::GraphError;
use rh_label::LabelError;
use rh_overlay::OverlayError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine configuration error: {0}")]
    Config(String),

    /// No graph node lies within the snapping radius of a coordinate.
    #[error("no road node near ({lat}, {lng}){}", nearest_hint(.nearest_m))]
    NoNearbyNode {
        lat:       f64,
        lng:       f64,
        nearest_m: Option<f64>,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

fn nearest_hint(nearest_m: &Option<f64>) -> String {
    match nearest_m {
        Some(d) => format!(": nearest is {d:.0} m away"),
        None => String::new(),
    }
}
