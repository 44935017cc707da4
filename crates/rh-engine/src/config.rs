//! Service configuration.
//!
//! Every field has a default, so a JSON file only needs the keys it
//! overrides:
//!
//! ```json
//! { "default_tau": 0.4, "slowdown": { "heavy": 0.25, "medium": 0.6, "light": 0.85 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use rh_label::{DEFAULT_LEAF_SIZE, DEFAULT_TAU, validate_tau};
use rh_overlay::{Severity, SlowdownTable};

use crate::error::{EngineError, EngineResult};

/// Tunables for [`RoutingService`][crate::RoutingService].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Impact threshold τ used when a request does not override it.
    pub default_tau:                 f64,
    /// Severity → slowdown ratio bands.  Validated on deserialization.
    pub slowdown:                    SlowdownTable,
    /// Maximum leaf size of the dynamic engine's partition tree.
    pub leaf_size:                   usize,
    /// Coordinates farther than this from every node are rejected.
    /// `None` disables the check.
    pub max_snap_distance_m:         Option<f64>,
    /// Lifetime of reported disruptions; `None` keeps them until removed.
    pub default_disruption_ttl_secs: Option<u64>,
    /// Speed used to derive travel times missing from edge records.
    pub default_speed_kph:           f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_tau:                 DEFAULT_TAU,
            slowdown:                    SlowdownTable::default(),
            leaf_size:                   DEFAULT_LEAF_SIZE,
            max_snap_distance_m:         Some(1_000.0),
            default_disruption_ttl_secs: Some(3_600),
            default_speed_kph:           30.0,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check ranges that serde alone cannot express.
    pub fn validate(&self) -> EngineResult<()> {
        validate_tau(self.default_tau).map_err(|e| EngineError::Config(e.to_string()))?;

        // Re-run the band checks for tables built in code.
        SlowdownTable::new(
            self.slowdown.ratio(Severity::Heavy),
            self.slowdown.ratio(Severity::Medium),
            self.slowdown.ratio(Severity::Light),
        )
        .map_err(|e| EngineError::Config(e.to_string()))?;

        if self.leaf_size == 0 {
            return Err(EngineError::Config("leaf_size must be at least 1".into()));
        }
        if let Some(d) = self.max_snap_distance_m {
            if !(d.is_finite() && d > 0.0) {
                return Err(EngineError::Config(format!("max_snap_distance_m must be positive, got {d}")));
            }
        }
        if !(self.default_speed_kph.is_finite() && self.default_speed_kph > 0.0) {
            return Err(EngineError::Config(format!(
                "default_speed_kph must be positive, got {}",
                self.default_speed_kph
            )));
        }
        Ok(())
    }
}
