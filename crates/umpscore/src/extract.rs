//! Record extraction from captured JSON bodies.

use crate::types::{CapturedResponse, Provenance, Record, Target};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Extract records from one response.
///
/// A sequence yields one record per mapping element (other elements are
/// skipped), a mapping yields exactly one record, anything else yields none.
pub fn extract_records(response: &CapturedResponse, target: &Target) -> Vec<Record> {
    let provenance = Provenance::new(target, response.url(), response.observed_at());
    match response.body() {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|fields| Record::new(fields.clone(), &provenance))
            .collect(),
        Value::Object(fields) => vec![Record::new(fields.clone(), &provenance)],
        _ => Vec::new(),
    }
}

/// Extract and concatenate records from every response, in order.
pub fn collect_records(responses: &[CapturedResponse], target: &Target) -> Vec<Record> {
    let records: Vec<Record> = responses
        .iter()
        .flat_map(|r| extract_records(r, target))
        .collect();
    tracing::debug!(
        responses = responses.len(),
        records = records.len(),
        entity = %target,
        "extracted records"
    );
    records
}

/// Turn scraped table rows into records stamped with the page URL.
pub fn records_from_rows(
    rows: Vec<Map<String, Value>>,
    target: &Target,
    page_url: &str,
    captured_at: DateTime<Utc>,
) -> Vec<Record> {
    let provenance = Provenance::new(target, page_url, captured_at);
    rows.into_iter()
        .map(|fields| Record::new(fields, &provenance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KEY_SOURCE_ENTITY, KEY_SOURCE_URL, PROVENANCE_KEYS};
    use chrono::TimeZone;
    use serde_json::json;

    fn response(body: Value) -> CapturedResponse {
        CapturedResponse::new(
            "https://umpscorecards.com/api/games",
            200,
            "application/json",
            body,
            Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap(),
        )
    }

    fn target() -> Target {
        Target::umpire("Adam Beck").unwrap()
    }

    #[test]
    fn test_sequence_skips_non_mappings() {
        let resp = response(json!([{"id": 1}, {"id": 2}, "not-a-map"]));
        let records = extract_records(&resp, &target());
        assert_eq!(records.len(), 2);
        for key in PROVENANCE_KEYS {
            assert_eq!(records[0].get(key), records[1].get(key));
        }
        assert_eq!(records[0].get("id"), Some(&json!(1)));
        assert_eq!(records[1].get("id"), Some(&json!(2)));
    }

    #[test]
    fn test_mapping_yields_one() {
        let records = extract_records(&response(json!({"games": 30})), &target());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get(KEY_SOURCE_ENTITY), Some(&json!("Adam Beck")));
        assert_eq!(
            records[0].get(KEY_SOURCE_URL),
            Some(&json!("https://umpscorecards.com/api/games"))
        );
    }

    #[test]
    fn test_scalars_and_empty_yield_none() {
        for body in [json!(42), json!(null), json!("x"), json!([]), json!([1, 2])] {
            assert!(extract_records(&response(body), &target()).is_empty());
        }
    }

    #[test]
    fn test_extraction_leaves_response_untouched() {
        let resp = response(json!([{"id": 1}]));
        let before = resp.body().clone();
        let _ = extract_records(&resp, &target());
        assert_eq!(resp.body(), &before);
    }

    #[test]
    fn test_records_from_rows() {
        let rows = vec![json!({"Date": "2024-05-01", "Acc": "94.1"})
            .as_object()
            .unwrap()
            .clone()];
        let records = records_from_rows(
            rows,
            &target(),
            "https://umpscorecards.com/data/single-umpire/Adam%20Beck",
            Utc::now(),
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_entity(), "Adam Beck");
        assert_eq!(records[0].get("Acc"), Some(&json!("94.1")));
    }
}
