//! `rh-output` — comparison metrics writers for the roadhub engine.
//!
//! One backend is provided:
//!
//! | Backend | Files created                                  |
//! |---------|------------------------------------------------|
//! | CSV     | `query_metrics.csv`, `batch_summaries.csv`     |
//!
//! Backends implement [`MetricsWriter`] and are driven by
//! [`MetricsObserver`], which implements `rh_engine::ComparisonObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rh_output::{CsvWriter, MetricsObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = MetricsObserver::new(writer, "disrupted");
//! service.compare_batch(&pairs, true, &mut obs);
//! obs.take_error().map(|e| eprintln!("output error: {e}"));
//! obs.into_writer().finish()?;
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::MetricsObserver;
pub use row::{BatchSummaryRow, QueryMetricRow};
pub use writer::MetricsWriter;
