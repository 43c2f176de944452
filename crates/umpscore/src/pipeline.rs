//! One-target normalization and run-level counters.

use crate::datefilter::{filter_by_date, DateRange};
use crate::extract::collect_records;
use crate::flatten::flatten_all;
use crate::types::{CapturedResponse, FlatRow, Record, Target};
use serde::{Deserialize, Serialize};

/// Output of [`normalize`] for a single target.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Records extracted before date filtering.
    pub records_captured: usize,
    /// Records that survived the date filter.
    pub records_kept: usize,
    pub rows: Vec<FlatRow>,
}

/// Extract → date-filter → flatten the responses captured for one target.
pub fn normalize(
    responses: &[CapturedResponse],
    target: &Target,
    range: &DateRange,
    sep: &str,
) -> Normalized {
    normalize_records(collect_records(responses, target), range, sep)
}

/// Date-filter and flatten already-extracted records.
pub fn normalize_records(records: Vec<Record>, range: &DateRange, sep: &str) -> Normalized {
    let records_captured = records.len();
    let kept = filter_by_date(records, range);
    Normalized {
        records_captured,
        records_kept: kept.len(),
        rows: flatten_all(&kept, sep),
    }
}

/// Counters reported at the end of every run, including empty ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub targets_ok: usize,
    pub targets_failed: usize,
    pub captured: usize,
    pub kept: usize,
}

impl RunSummary {
    pub fn record_target(&mut self, normalized: &Normalized) {
        self.targets_ok += 1;
        self.captured += normalized.records_captured;
        self.kept += normalized.records_kept;
    }

    pub fn record_failure(&mut self) {
        self.targets_failed += 1;
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} captured, {} kept after filtering ({} targets ok, {} failed)",
            self.captured, self.kept, self.targets_ok, self.targets_failed
        )
    }
}
