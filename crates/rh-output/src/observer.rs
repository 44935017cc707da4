//! `MetricsObserver<W>` — bridges `ComparisonObserver` to a `MetricsWriter`.

use rh_engine::{BatchSummary, Comparison, ComparisonObserver, EngineError, OdPair};

use crate::row::{BatchSummaryRow, QueryMetricRow};
use crate::writer::MetricsWriter;
use crate::{OutputError, OutputResult};

/// A [`ComparisonObserver`] that writes one metrics row per engine per pair
/// and one summary row per batch to any [`MetricsWriter`].
///
/// Errors from the writer are stored internally because observer methods
/// have no return value.  After a batch returns, check for errors with
/// [`take_error`][Self::take_error].
pub struct MetricsObserver<W: MetricsWriter> {
    writer:     W,
    run:        String,
    failures:   usize,
    last_error: Option<OutputError>,
}

impl<W: MetricsWriter> MetricsObserver<W> {
    /// Create an observer backed by `writer`; rows are tagged with `run`.
    pub fn new(writer: W, run: impl Into<String>) -> Self {
        Self { writer, run: run.into(), failures: 0, last_error: None }
    }

    /// Tag rows of subsequent batches with `run`.
    pub fn set_run(&mut self, run: impl Into<String>) {
        self.run = run.into();
    }

    /// Pairs that could not be routed, across all batches.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Take the stored write error (if any).
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer, e.g. to call `finish`.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                tracing::error!(error = %e, "metrics write failed");
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: MetricsWriter> ComparisonObserver for MetricsObserver<W> {
    fn on_comparison(&mut self, index: usize, _pair: &OdPair, comparison: &Comparison) {
        let rows = QueryMetricRow::pair_rows(&self.run, index as u64, comparison);
        let result = self.writer.write_query_rows(&rows);
        self.store_err(result);
    }

    fn on_failure(&mut self, index: usize, pair: &OdPair, error: &EngineError) {
        self.failures += 1;
        tracing::warn!(
            pair = index,
            origin = %pair.origin,
            destination = %pair.destination,
            error = %error,
            "pair skipped in metrics"
        );
    }

    fn on_batch_end(&mut self, summary: &BatchSummary) {
        let row = BatchSummaryRow {
            run:                self.run.clone(),
            pairs:              summary.pairs as u64,
            succeeded:          summary.succeeded as u64,
            failed:             summary.failed as u64,
            disagreements:      summary.disagreements as u64,
            mean_dhl_query_ms:  summary.mean_dhl_query_ms,
            mean_hc2l_query_ms: summary.mean_hc2l_query_ms,
        };
        let result = self.writer.write_batch_summary(&row);
        self.store_err(result);
        let result = self.writer.flush();
        self.store_err(result);
    }
}
