//! End-to-end tests of the capture → extract → filter → flatten → write chain.
//!
//! These use hand-built `CapturedResponse`s standing in for browser traffic.

use chrono::{TimeZone, Utc};
use serde_json::json;
use umpscore::types::{KEY_CAPTURED_AT, KEY_SOURCE_ENTITY, KEY_SOURCE_URL};
use umpscore::*;

// ─────────────────────── helpers ───────────────────────

fn captured(url: &str, body: serde_json::Value) -> CapturedResponse {
    CapturedResponse::new(
        url,
        200,
        "application/json",
        body,
        Utc.with_ymd_and_hms(2025, 9, 14, 18, 30, 0).unwrap(),
    )
}

fn adam_beck() -> Target {
    Target::umpire("Adam Beck").unwrap()
}

// ─────────────────────── tests ───────────────────────

#[test]
fn two_responses_merge_into_three_rows() {
    let responses = vec![
        captured(
            "https://umpscorecards.com/api/games?umpire=Adam%20Beck",
            json!([
                {"game_id": 1, "date": "2024-04-02", "accuracy": {"overall": 94.2}},
                {"game_id": 2, "date": "2024-04-09", "accuracy": {"overall": 91.7}}
            ]),
        ),
        captured(
            "https://umpscorecards.com/api/umpire?name=Adam%20Beck",
            json!({"name": "Adam Beck", "games": 2, "seasons": [{"year": 2024, "games": 2}]}),
        ),
    ];

    let records = collect_records(&responses, &adam_beck());
    assert_eq!(records.len(), 3);

    let rows = flatten_all(&records, DEFAULT_SEPARATOR);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get("accuracy_overall"), Some(&json!(94.2)));
    assert_eq!(rows[2].get("seasons_0_year"), Some(&json!(2024)));

    for row in &rows {
        assert_eq!(row.to_cell(KEY_SOURCE_ENTITY), "Adam Beck");
        assert!(!row.to_cell(KEY_CAPTURED_AT).is_empty());
    }
    assert!(rows[2].to_cell(KEY_SOURCE_URL).contains("/api/umpire?"));
}

#[test]
fn classifier_gates_what_reaches_the_extractor() {
    let classifier = Classifier::new(UrlPolicy::Strict);
    let observed = [
        ("https://umpscorecards.com/api/games", 200, "application/json"),
        ("https://umpscorecards.com/api/games", 404, "application/json"),
        ("https://umpscorecards.com/api/page", 200, "text/html"),
        ("https://fonts.example.com/v1/css", 200, "application/json"),
    ];
    let kept: Vec<_> = observed
        .iter()
        .filter(|(url, status, ct)| classifier.is_capturable(url, *status, ct))
        .collect();
    assert_eq!(kept.len(), 1);
}

#[test]
fn date_filter_then_table() {
    let responses = vec![captured(
        "https://umpscorecards.com/api/games",
        json!([
            {"date": "2023-12-31", "id": "a"},
            {"date": "2024-06-15", "id": "b"},
            {"game_date": "06/20/2024", "id": "c", "extra": {"note": "rain delay"}},
            {"id": "d"}
        ]),
    )];
    let range = DateRange::parse(Some("2024-01-01"), Some("2024-12-31")).unwrap();
    let out = normalize(&responses, &adam_beck(), &range, DEFAULT_SEPARATOR);
    assert_eq!(out.records_captured, 4);
    assert_eq!(out.records_kept, 2);

    let table = Table::from_rows(out.rows);
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.cell(0, "id").unwrap(), "b");
    assert_eq!(table.cell(0, "extra_note").unwrap(), "");
    assert_eq!(table.cell(1, "extra_note").unwrap(), "rain delay");
}

#[test]
fn table_of_three_heterogeneous_records() {
    let responses = vec![captured(
        "https://umpscorecards.com/api/mixed",
        json!([{"a": 1}, {"b": 2}, {"a": 3, "c": 4}]),
    )];
    let rows = flatten_all(&collect_records(&responses, &adam_beck()), "_");
    let table = Table::from_rows(rows);

    // a, b, c plus the three provenance columns.
    assert_eq!(table.column_count(), 6);
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.cell(0, "b").unwrap(), "");
    assert_eq!(table.cell(1, "a").unwrap(), "");
    assert_eq!(table.cell(2, "c").unwrap(), "4");
}

#[test]
fn save_writes_header_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let responses = vec![captured(
        "https://umpscorecards.com/api/games",
        json!([{"id": 1}, {"id": 2, "x": "y"}]),
    )];
    let rows = flatten_all(&collect_records(&responses, &adam_beck()), "_");

    let outcome = save_rows(rows, dir.path(), Some("adam_beck_2024.csv"), b',').unwrap();
    let SaveOutcome::Saved { path, rows, columns } = outcome else {
        panic!("expected a saved file");
    };
    assert_eq!(rows, 2);
    assert_eq!(columns, 5);

    let text = std::fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,source_entity,source_url,captured_at,x"
    );
    assert_eq!(lines.count(), 2);
}
