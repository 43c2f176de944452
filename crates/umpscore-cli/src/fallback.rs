//! HTML table rows as a last resort when a page yields no JSON.
//!
//! Uses the `scraper` crate on the rendered page HTML. Only tables with a
//! header row and at least one data row are read.

use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

/// Extract one mapping per data row across every table in `html`.
///
/// Headers come from the first row's `th`/`td` cells. A data row is kept
/// only when its `td` count equals the header count.
pub fn extract_tables(html: &str) -> Vec<Map<String, Value>> {
    let (Ok(table_sel), Ok(row_sel), Ok(header_sel), Ok(cell_sel)) = (
        Selector::parse("table"),
        Selector::parse("tr"),
        Selector::parse("th, td"),
        Selector::parse("td"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut out = Vec::new();

    for table in document.select(&table_sel) {
        let rows: Vec<ElementRef> = table.select(&row_sel).collect();
        if rows.len() < 2 {
            continue;
        }

        let headers: Vec<String> = rows[0].select(&header_sel).map(cell_text).collect();

        for row in &rows[1..] {
            let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
            if cells.len() != headers.len() {
                continue;
            }
            let mapped: Map<String, Value> = headers
                .iter()
                .cloned()
                .zip(cells.into_iter().map(Value::String))
                .collect();
            out.push(mapped);
        }
    }

    tracing::debug!("extracted {} table rows from HTML", out.len());
    out
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = r#"
        <html><body>
          <table>
            <tr><th>Date</th><th>Teams</th><th>Accuracy</th></tr>
            <tr><td>2024-05-01</td><td> NYY @ BOS </td><td>94.1</td></tr>
            <tr><td colspan="3">Totals</td></tr>
            <tr><td>2024-05-03</td><td>LAD @ SF</td><td>92.7</td></tr>
          </table>
          <table><tr><th>Lonely header</th></tr></table>
        </body></html>
    "#;

    #[test]
    fn test_extract_tables() {
        let rows = extract_tables(PAGE);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Teams"], json!("NYY @ BOS"));
        assert_eq!(rows[1]["Date"], json!("2024-05-03"));
        assert_eq!(
            rows[0].keys().collect::<Vec<_>>(),
            vec!["Date", "Teams", "Accuracy"]
        );
    }

    #[test]
    fn test_no_tables() {
        assert!(extract_tables("<p>nothing here</p>").is_empty());
    }
}
