//! Severity → slowdown ratio table.
//!
//! Each severity has a fixed band; a table outside its bands is rejected at
//! construction, so any valid table orders `Heavy < Medium < Light` by ratio.
//!
//! | Severity | Band         | Default |
//! |----------|--------------|---------|
//! | Heavy    | `(0, 0.4]`   | 0.30    |
//! | Medium   | `(0.4, 0.7]` | 0.60    |
//! | Light    | `(0.7, 1.0)` | 0.85    |

use crate::disruption::Severity;
use crate::error::{OverlayError, OverlayResult};

/// Validated slowdown ratios per severity.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawTable"))]
pub struct SlowdownTable {
    heavy:  f64,
    medium: f64,
    light:  f64,
}

impl SlowdownTable {
    pub fn new(heavy: f64, medium: f64, light: f64) -> OverlayResult<Self> {
        check(Severity::Heavy, heavy, |r| r > 0.0 && r <= 0.4, "(0, 0.4]")?;
        check(Severity::Medium, medium, |r| r > 0.4 && r <= 0.7, "(0.4, 0.7]")?;
        check(Severity::Light, light, |r| r > 0.7 && r < 1.0, "(0.7, 1.0)")?;
        Ok(Self { heavy, medium, light })
    }

    #[inline]
    pub fn ratio(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Heavy  => self.heavy,
            Severity::Medium => self.medium,
            Severity::Light  => self.light,
        }
    }

    /// Jam factor implied by a ratio: `10 − 10·ratio`, or 10 for a closure.
    pub fn jam_factor(ratio: f64, closed: bool) -> f64 {
        if closed {
            10.0
        } else {
            (10.0 - 10.0 * ratio).clamp(0.0, 10.0)
        }
    }
}

impl Default for SlowdownTable {
    fn default() -> Self {
        Self { heavy: 0.3, medium: 0.6, light: 0.85 }
    }
}

fn check(severity: Severity, ratio: f64, ok: impl Fn(f64) -> bool, band: &'static str) -> OverlayResult<()> {
    if ratio.is_finite() && ok(ratio) {
        Ok(())
    } else {
        Err(OverlayError::InvalidTable { severity, ratio, band })
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawTable {
    heavy:  f64,
    medium: f64,
    light:  f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawTable> for SlowdownTable {
    type Error = OverlayError;
    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        SlowdownTable::new(raw.heavy, raw.medium, raw.light)
    }
}
