//! The `MetricsWriter` trait implemented by backend writers.

use crate::{BatchSummaryRow, OutputResult, QueryMetricRow};

/// Sink for per-query metrics and per-batch summaries.
///
/// Errors raised while a batch runs are stored by
/// [`MetricsObserver`][crate::MetricsObserver] and retrieved with
/// [`take_error`][crate::MetricsObserver::take_error].
pub trait MetricsWriter {
    /// Write the metric rows of one comparison (one row per engine).
    fn write_query_rows(&mut self, rows: &[QueryMetricRow]) -> OutputResult<()>;

    fn write_batch_summary(&mut self, row: &BatchSummaryRow) -> OutputResult<()>;

    /// Push buffered rows to the underlying files.
    fn flush(&mut self) -> OutputResult<()>;

    /// Flush and close.  Idempotent.
    fn finish(&mut self) -> OutputResult<()>;
}
