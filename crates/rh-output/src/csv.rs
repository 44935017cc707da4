//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `query_metrics.csv`
//! - `batch_summaries.csv`
//!
//! Unavailable diagnostics are written as `unavailable`.

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::MetricsWriter;
use crate::{BatchSummaryRow, OutputResult, QueryMetricRow};

pub const QUERY_METRICS_FILE: &str = "query_metrics.csv";
pub const BATCH_SUMMARIES_FILE: &str = "batch_summaries.csv";

/// Writes comparison metrics to two CSV files.
pub struct CsvWriter {
    queries:   Writer<File>,
    summaries: Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Create `dir` if needed, open the two CSV files, and write headers.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;

        let mut queries = Writer::from_path(dir.join(QUERY_METRICS_FILE))?;
        queries.write_record([
            "run",
            "pair",
            "engine",
            "origin_node",
            "destination_node",
            "distance_m",
            "time_s",
            "query_ms",
            "labeling_ms",
            "labeling_bytes",
            "label_entries",
            "fallback",
            "frechet_m",
            "overlap_percent",
        ])?;

        let mut summaries = Writer::from_path(dir.join(BATCH_SUMMARIES_FILE))?;
        summaries.write_record([
            "run",
            "pairs",
            "succeeded",
            "failed",
            "disagreements",
            "mean_dhl_query_ms",
            "mean_hc2l_query_ms",
        ])?;

        Ok(Self { queries, summaries, finished: false })
    }
}

fn diagnostic(v: Option<f64>) -> String {
    v.map_or_else(|| "unavailable".to_owned(), |v| format!("{v:.3}"))
}

impl MetricsWriter for CsvWriter {
    fn write_query_rows(&mut self, rows: &[QueryMetricRow]) -> OutputResult<()> {
        for row in rows {
            self.queries.write_record(&[
                row.run.clone(),
                row.pair.to_string(),
                row.engine.clone(),
                row.origin_node.to_string(),
                row.destination_node.to_string(),
                format!("{:.1}", row.distance_m),
                format!("{:.3}", row.time_s),
                format!("{:.4}", row.query_ms),
                format!("{:.3}", row.labeling_ms),
                row.labeling_bytes.to_string(),
                row.label_entries.to_string(),
                (row.fallback as u8).to_string(),
                diagnostic(row.frechet_m),
                diagnostic(row.overlap_percent),
            ])?;
        }
        Ok(())
    }

    fn write_batch_summary(&mut self, row: &BatchSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(&[
            row.run.clone(),
            row.pairs.to_string(),
            row.succeeded.to_string(),
            row.failed.to_string(),
            row.disagreements.to_string(),
            format!("{:.4}", row.mean_dhl_query_ms),
            format!("{:.4}", row.mean_hc2l_query_ms),
        ])?;
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.queries.flush()?;
        self.summaries.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.flush()
    }
}
