//! Date-range filtering of records.
//!
//! A record's date is resolved by scanning [`DATE_FIELDS`] in order and taking
//! the first present field whose value parses under one of [`DATE_STRATEGIES`].
//! Field priority is fixed; it never depends on which value parses "best".

use crate::types::{HarvestError, HarvestResult, Record};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Candidate date fields, highest priority first.
pub const DATE_FIELDS: &[&str] = &[
    "date",
    "game_date",
    "Date",
    "gameDate",
    "Game Date",
    "created_at",
    "timestamp",
];

/// Epoch values above this are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// A named parse strategy for date strings.
pub struct DateStrategy {
    pub name: &'static str,
    parse: fn(&str) -> Option<NaiveDate>,
}

impl DateStrategy {
    pub fn parse(&self, s: &str) -> Option<NaiveDate> {
        (self.parse)(s)
    }
}

impl std::fmt::Debug for DateStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateStrategy").field("name", &self.name).finish()
    }
}

/// Parse strategies, tried in order. ISO 8601 forms first, then locale variants.
///
/// `%m/%d/%Y` precedes `%d/%m/%Y`, so `03/04/2024` is March 4th.
pub const DATE_STRATEGIES: &[DateStrategy] = &[
    DateStrategy {
        name: "rfc3339",
        parse: |s| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()),
    },
    DateStrategy {
        name: "iso_datetime",
        parse: |s| {
            [
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%dT%H:%M",
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%d %H:%M",
            ]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|dt| dt.date())
        },
    },
    DateStrategy {
        name: "iso_date",
        parse: |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
    },
    DateStrategy {
        name: "slash_ymd",
        parse: |s| NaiveDate::parse_from_str(s, "%Y/%m/%d").ok(),
    },
    DateStrategy {
        name: "us_mdy",
        parse: |s| NaiveDate::parse_from_str(s, "%m/%d/%Y").ok(),
    },
    DateStrategy {
        name: "eu_dmy",
        parse: |s| NaiveDate::parse_from_str(s, "%d/%m/%Y").ok(),
    },
    DateStrategy {
        name: "long_month",
        parse: |s| NaiveDate::parse_from_str(s, "%B %d, %Y").ok(),
    },
    DateStrategy {
        name: "short_month",
        parse: |s| NaiveDate::parse_from_str(s, "%b %d, %Y").ok(),
    },
    DateStrategy {
        name: "rfc2822",
        parse: |s| DateTime::parse_from_rfc2822(s).ok().map(|dt| dt.date_naive()),
    },
    DateStrategy {
        name: "epoch_digits",
        parse: |s| {
            if (s.len() == 10 || s.len() == 13) && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok().and_then(epoch_to_date)
            } else {
                None
            }
        },
    },
];

/// Parse a date string with the first strategy that accepts it.
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_STRATEGIES.iter().find_map(|strategy| strategy.parse(s))
}

/// Parse a JSON value as a date. Numbers are Unix epoch seconds (or millis).
pub fn parse_date_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date_str(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_to_epoch))
            .and_then(epoch_to_date),
        _ => None,
    }
}

/// Whole seconds of a float epoch. Non-finite or out-of-range values are rejected.
fn float_to_epoch(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

fn epoch_to_date(n: i64) -> Option<NaiveDate> {
    let secs = if n.unsigned_abs() > EPOCH_MILLIS_THRESHOLD as u64 {
        n / 1000
    } else {
        n
    };
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

/// The record's best-guess date, by fixed field priority.
pub fn resolve_date(record: &Record) -> Option<NaiveDate> {
    DATE_FIELDS
        .iter()
        .filter_map(|field| record.get(field))
        .find_map(parse_date_value)
}

/// An inclusive calendar-date range. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// The range that keeps everything.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Parse bounds. Blank or missing strings are open bounds.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> HarvestResult<Self> {
        let bound = |raw: Option<&str>, which: &str| -> HarvestResult<Option<NaiveDate>> {
            match raw.map(str::trim).filter(|s| !s.is_empty()) {
                None => Ok(None),
                Some(s) => parse_date_str(s)
                    .map(Some)
                    .ok_or_else(|| HarvestError::InvalidDate(format!("{which} bound '{s}'"))),
            }
        };
        Ok(Self {
            start: bound(start, "start")?,
            end: bound(end, "end")?,
        })
    }

    /// Like [`DateRange::parse`], but a bad bound is logged and yields the
    /// unbounded range.
    pub fn parse_or_unbounded(start: Option<&str>, end: Option<&str>) -> Self {
        Self::parse(start, end).unwrap_or_else(|e| {
            tracing::error!("{e}; date filtering disabled");
            Self::unbounded()
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |d: Option<NaiveDate>, open: &'static str| {
            d.map(|d| d.to_string()).unwrap_or_else(|| open.to_string())
        };
        write!(
            f,
            "{} to {}",
            show(self.start, "beginning"),
            show(self.end, "present")
        )
    }
}

/// Keep records whose resolved date falls in `range`.
///
/// An unbounded range returns the input untouched. Under a bounded range,
/// records with no parseable date are dropped.
pub fn filter_by_date(records: Vec<Record>, range: &DateRange) -> Vec<Record> {
    if range.is_unbounded() {
        return records;
    }
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            tracing::warn!(%start, %end, "date range is inverted; nothing can match");
        }
    }

    let total = records.len();
    let kept: Vec<Record> = records
        .into_iter()
        .filter(|r| resolve_date(r).is_some_and(|d| range.contains(d)))
        .collect();
    tracing::info!("Filtered {} items from {} total items", kept.len(), total);
    kept
}

/// Filter with string bounds. A bad bound is logged and disables filtering.
pub fn filter_by_date_str(
    records: Vec<Record>,
    start: Option<&str>,
    end: Option<&str>,
) -> Vec<Record> {
    filter_by_date(records, &DateRange::parse_or_unbounded(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Provenance, Target};
    use chrono::Utc;
    use serde_json::json;

    fn record(fields: Value) -> Record {
        let target = Target::umpire("Pat Hoberg").unwrap();
        let prov = Provenance::new(&target, "https://x/api", Utc::now());
        Record::new(fields.as_object().unwrap().clone(), &prov)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bounded_range_inclusive() {
        let records = vec![
            record(json!({"date": "2023-12-31"})),
            record(json!({"date": "2024-06-15"})),
            record(json!({"date": "2024-12-31"})),
            record(json!({"date": "2024-01-01"})),
        ];
        let kept = filter_by_date_str(records, Some("2024-01-01"), Some("2024-12-31"));
        let dates: Vec<_> = kept.iter().map(|r| r.get("date").unwrap().clone()).collect();
        assert_eq!(
            dates,
            vec![json!("2024-06-15"), json!("2024-12-31"), json!("2024-01-01")]
        );
    }

    #[test]
    fn test_unbounded_returns_input_unchanged() {
        let records = vec![
            record(json!({"date": "2020-01-01"})),
            record(json!({"no_date": true})),
            record(json!({"date": "garbage"})),
        ];
        let kept = filter_by_date(records.clone(), &DateRange::unbounded());
        assert_eq!(kept, records);
    }

    #[test]
    fn test_undated_excluded_when_bounded() {
        let records = vec![record(json!({"id": 1})), record(json!({"date": "not a date"}))];
        let range = DateRange::new(Some(ymd(2000, 1, 1)), None);
        assert!(filter_by_date(records, &range).is_empty());
    }

    #[test]
    fn test_first_parseable_field_wins() {
        // `date` is present but unparseable, so `game_date` is used.
        let r = record(json!({"date": "TBD", "game_date": "06/15/2024", "timestamp": 0}));
        assert_eq!(resolve_date(&r), Some(ymd(2024, 6, 15)));

        // `date` parses, so the conflicting later field is ignored.
        let r = record(json!({"gameDate": "2022-01-01", "date": "2024-06-15"}));
        assert_eq!(resolve_date(&r), Some(ymd(2024, 6, 15)));
    }

    #[test]
    fn test_strategies() {
        assert_eq!(parse_date_str("2024-06-15T19:05:00Z"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_date_str("2024-06-15 19:05:00"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_date_str("2024/06/15"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_date_str("25/12/2024"), Some(ymd(2024, 12, 25)));
        assert_eq!(parse_date_str("03/04/2024"), Some(ymd(2024, 3, 4)));
        assert_eq!(parse_date_str("June 15, 2024"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_date_str("Jun 15, 2024"), Some(ymd(2024, 6, 15)));
        assert_eq!(
            parse_date_str("Sat, 15 Jun 2024 10:00:00 +0000"),
            Some(ymd(2024, 6, 15))
        );
        assert_eq!(parse_date_str(""), None);
        assert_eq!(parse_date_str("yesterday"), None);
    }

    #[test]
    fn test_epoch_values() {
        assert_eq!(parse_date_value(&json!(1718409600)), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_date_value(&json!(1718409600000i64)), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_date_value(&json!("1718409600")), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_date_value(&json!(true)), None);
    }

    #[test]
    fn test_extreme_epoch_values_do_not_panic() {
        assert_eq!(parse_date_value(&json!(i64::MIN)), None);
        assert_eq!(parse_date_value(&json!(i64::MAX)), None);
        assert_eq!(parse_date_value(&json!(-1e300)), None);
        assert_eq!(parse_date_value(&json!(1e300)), None);
        assert_eq!(parse_date_value(&json!(1718409600.5)), Some(ymd(2024, 6, 15)));

        let records = vec![
            record(json!({"timestamp": -1e300})),
            record(json!({"timestamp": i64::MIN})),
            record(json!({"date": "2024-06-15"})),
        ];
        let range = DateRange::new(Some(ymd(2024, 1, 1)), None);
        let kept = filter_by_date(records, &range);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get("date"), Some(&json!("2024-06-15")));
    }

    #[test]
    fn test_bad_bound_disables_filter() {
        let records = vec![record(json!({"date": "2019-01-01"}))];
        let kept = filter_by_date_str(records.clone(), Some("not-a-date"), None);
        assert_eq!(kept, records);
        assert!(DateRange::parse(Some("nope"), None).is_err());
        let range = DateRange::parse_or_unbounded(Some("2024-01-01"), Some("2024-13-45"));
        assert!(range.is_unbounded());
    }

    #[test]
    fn test_blank_bounds_are_open() {
        let range = DateRange::parse(Some("  "), Some("")).unwrap();
        assert!(range.is_unbounded());
        assert_eq!(range.to_string(), "beginning to present");
    }
}
