//! Observer trait for batch comparisons.

use serde::Serialize;

use crate::compare::{Comparison, OdPair};
use crate::error::EngineError;

/// Totals for one [`RoutingService::compare_batch`][crate::RoutingService::compare_batch] run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub pairs:              usize,
    pub succeeded:          usize,
    pub failed:             usize,
    /// Pairs where the engines returned different travel times.
    pub disagreements:      usize,
    pub mean_dhl_query_ms:  f64,
    pub mean_hc2l_query_ms: f64,
}

/// Callbacks invoked by `compare_batch` for each pair and at the end.
///
/// All methods default to no-ops.
///
/// ```rust,ignore
/// struct Printer;
///
/// impl ComparisonObserver for Printer {
///     fn on_comparison(&mut self, index: usize, _pair: &OdPair, c: &Comparison) {
///         println!("#{index}: {:.1} s", c.hc2l.total_time_s);
///     }
/// }
/// ```
pub trait ComparisonObserver {
    fn on_comparison(&mut self, _index: usize, _pair: &OdPair, _comparison: &Comparison) {}

    /// A pair that could not be routed (unsnappable or unreachable).
    fn on_failure(&mut self, _index: usize, _pair: &OdPair, _error: &EngineError) {}

    fn on_batch_end(&mut self, _summary: &BatchSummary) {}
}

/// A [`ComparisonObserver`] that does nothing.
pub struct NoopObserver;

impl ComparisonObserver for NoopObserver {}
