//! umpscore: capture-and-normalize pipeline for umpire scorecard data.
//!
//! Turns JSON responses observed during a browser visit into flat rows:
//! classify → extract → date-filter → flatten → write.

pub mod classify;
pub mod datefilter;
pub mod extract;
pub mod flatten;
pub mod pipeline;
pub mod roster;
pub mod structure;
pub mod table;
pub mod types;

pub use classify::{looks_like_endpoint, Classifier, UrlPolicy};
pub use datefilter::{filter_by_date, filter_by_date_str, resolve_date, DateRange};
pub use extract::{collect_records, extract_records, records_from_rows};
pub use flatten::{flatten, flatten_all, DEFAULT_SEPARATOR};
pub use pipeline::{normalize, Normalized, RunSummary};
pub use table::{save_rows, SaveOutcome, Table, TableWriter};
pub use types::*;
